//! Lifecycle scenario runner
//!
//! Loads YAML lifecycle scenarios and runs them against a manager client,
//! reporting which steps passed and the first failure with the messages
//! that caused it.

mod config;
mod runner;

pub use config::*;
pub use runner::{run_scenario, RunOptions, TestResult};
