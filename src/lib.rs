//! ami-lifecycle - command/event correlation over the Asterisk Manager Interface
//!
//! This library sends manager actions, reads their replies, correlates the
//! asynchronous events that follow them by content, and builds entity
//! lifecycle checks (create, list, delete, list) on top.

pub mod ami;
pub mod cli;
pub mod commands;
pub mod common;
pub mod lifecycle;
pub mod testing;

// Re-export commonly used types for tests
pub use ami::{Action, ManagerClient, Message};
pub use common::{Error, Result};
