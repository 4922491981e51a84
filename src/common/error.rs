//! Error types for the manager client and lifecycle checks
//!
//! Every failure a scenario can hit is a distinct variant so callers can
//! tell a dropped connection from a rejected action or a missing event
//! without matching on message text.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::ami::Message;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("Manager session is closed")]
    SessionClosed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Timed out connecting to manager after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Timed out waiting for a block after {0:?}")]
    ReadTimeout(Duration),

    // === Wire Format Errors ===
    #[error("Cannot encode action: {reason}")]
    Encode { reason: String },

    #[error("Malformed line in block (no ':' delimiter): {line:?}")]
    Decode { line: String },

    #[error("Protocol error in reply to '{action}': {reason}")]
    Protocol { action: String, reason: String },

    // === Remote Answers ===
    #[error("Login rejected: {0}")]
    LoginFailed(String),

    #[error("Action '{action}' rejected: {response}")]
    ActionRejected { action: String, response: Message },

    #[error("No '{event}' event after {attempts} blocks")]
    EventTimeout { event: String, attempts: usize },

    #[error("{step} failed: {reason}")]
    Verification {
        step: String,
        reason: String,
        payload: Vec<Message>,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an encode error
    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
        }
    }

    /// Create an action rejected error carrying the offending reply
    pub fn action_rejected(action: &str, response: Message) -> Self {
        Self::ActionRejected {
            action: action.to_string(),
            response,
        }
    }

    /// Create a verification error with the messages that contradicted it
    pub fn verification(step: &str, reason: impl Into<String>, payload: Vec<Message>) -> Self {
        Self::Verification {
            step: step.to_string(),
            reason: reason.into(),
            payload,
        }
    }

    /// Stable code naming the failure kind
    pub fn code(&self) -> &'static str {
        match self {
            Error::SessionClosed
            | Error::Transport(_)
            | Error::Io(_)
            | Error::ConnectTimeout(_)
            | Error::ReadTimeout(_) => "TRANSPORT",
            Error::Encode { .. } => "ENCODE",
            Error::Decode { .. } => "DECODE",
            Error::Protocol { .. } => "PROTOCOL",
            Error::LoginFailed(_) => "LOGIN_FAILED",
            Error::ActionRejected { .. } => "ACTION_REJECTED",
            Error::EventTimeout { .. } => "EVENT_TIMEOUT",
            Error::Verification { .. } => "VERIFICATION",
            Error::Config(_) | Error::ConfigParse(_) | Error::FileRead { .. } => "CONFIG",
            Error::Json(_) | Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Messages attached to the failure for diagnostics
    pub fn payload(&self) -> Vec<Message> {
        match self {
            Error::ActionRejected { response, .. } => vec![response.clone()],
            Error::Verification { payload, .. } => payload.clone(),
            _ => Vec::new(),
        }
    }
}

/// Serializable failure summary used in scenario reports
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScenarioFailure {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payload: Vec<Message>,
}

impl From<&Error> for ScenarioFailure {
    fn from(e: &Error) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.to_string(),
            payload: e.payload(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_distinguish_failure_kinds() {
        assert_eq!(Error::SessionClosed.code(), "TRANSPORT");
        assert_eq!(
            Error::ReadTimeout(Duration::from_secs(3)).code(),
            "TRANSPORT"
        );
        assert_eq!(
            Error::EventTimeout {
                event: "OutCampaignCreate".to_string(),
                attempts: 10
            }
            .code(),
            "EVENT_TIMEOUT"
        );
        assert_eq!(
            Error::verification("assert_present", "missing", Vec::new()).code(),
            "VERIFICATION"
        );
    }

    #[test]
    fn test_failure_carries_payload() {
        let reply = Message::from_pairs([("Response", "Error"), ("Message", "no plan")]);
        let err = Error::action_rejected("OutCampaignCreate", reply.clone());
        let failure = ScenarioFailure::from(&err);

        assert_eq!(failure.code, "ACTION_REJECTED");
        assert_eq!(failure.payload, vec![reply]);
        assert!(failure.message.contains("OutCampaignCreate"));
    }
}
