//! Asterisk Manager Interface (AMI) client
//!
//! Sends actions, reads their synchronous replies and correlates the
//! asynchronous events that follow them.

pub mod client;
pub mod codec;
pub mod correlator;
pub mod dispatcher;
pub mod framing;
pub mod memory;
pub mod message;
pub mod session;

pub use client::ManagerClient;
pub use correlator::{CorrelationState, EventMatcher, DEFAULT_EVENT_ATTEMPTS};
pub use framing::ListFraming;
pub use memory::MemorySession;
pub use message::{Action, Message};
pub use session::{StreamSession, TcpSession, WireSession};
