//! Event correlation
//!
//! Events carry no reference to the action that caused them, so the only
//! way to pair them up is by content. A wait consumes inbound blocks one at
//! a time, each counting against a fixed attempt budget, until a block
//! satisfies the caller's predicate.

use std::collections::VecDeque;
use std::fmt;

use crate::common::{Error, Result};

use super::codec;
use super::message::{Message, EVENT};
use super::session::WireSession;

/// Blocks read while waiting for one event before giving up
pub const DEFAULT_EVENT_ATTEMPTS: usize = 10;

/// State of a single wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationState {
    Waiting,
    Matched,
    Exhausted,
}

impl fmt::Display for CorrelationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Matched => write!(f, "matched"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Attempt accounting for one wait
#[derive(Debug, Clone)]
pub struct EventWait {
    state: CorrelationState,
    attempts: usize,
    budget: usize,
}

impl EventWait {
    pub fn new(budget: usize) -> Self {
        let state = if budget == 0 {
            CorrelationState::Exhausted
        } else {
            CorrelationState::Waiting
        };
        Self {
            state,
            attempts: 0,
            budget,
        }
    }

    pub fn state(&self) -> CorrelationState {
        self.state
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Record one consumed block and whether it matched
    pub fn observe(&mut self, matched: bool) -> CorrelationState {
        if self.state != CorrelationState::Waiting {
            return self.state;
        }
        self.attempts += 1;
        self.state = if matched {
            CorrelationState::Matched
        } else if self.attempts >= self.budget {
            CorrelationState::Exhausted
        } else {
            CorrelationState::Waiting
        };
        self.state
    }
}

/// Content predicate: an event name plus fields that must echo back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMatcher {
    event: String,
    fields: Vec<(String, String)>,
}

impl EventMatcher {
    pub fn event(name: impl Into<String>) -> Self {
        Self {
            event: name.into(),
            fields: Vec::new(),
        }
    }

    /// Also require `name` to equal `value`
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn event_name(&self) -> &str {
        &self.event
    }

    pub fn matches(&self, message: &Message) -> bool {
        message.get(EVENT) == Some(self.event.as_str())
            && self
                .fields
                .iter()
                .all(|(k, v)| message.get(k) == Some(v.as_str()))
    }
}

impl fmt::Display for EventMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event)?;
        for (k, v) in &self.fields {
            write!(f, " {}={}", k, v)?;
        }
        Ok(())
    }
}

/// Wait for the first event satisfying `predicate`
///
/// Parked events in `backlog` are consumed before the wire. Every consumed
/// block counts one attempt whether it matches or not; after `max_attempts`
/// blocks without a match the wait fails with [`Error::EventTimeout`].
/// `label` names the awaited event in logs and errors.
pub async fn await_event<S, P>(
    session: &mut S,
    backlog: &mut VecDeque<Message>,
    label: &str,
    predicate: P,
    max_attempts: usize,
) -> Result<Message>
where
    S: WireSession + ?Sized,
    P: Fn(&Message) -> bool,
{
    let mut wait = EventWait::new(max_attempts);

    while wait.state() == CorrelationState::Waiting {
        let message = match backlog.pop_front() {
            Some(parked) => parked,
            None => {
                let raw = session.read_block().await?;
                codec::decode(&raw)?
            }
        };

        let matched = !message.is_empty() && predicate(&message);
        tracing::debug!(
            "AMI <<< {} (awaiting {}, attempt {}/{})",
            message,
            label,
            wait.attempts() + 1,
            max_attempts
        );

        if wait.observe(matched) == CorrelationState::Matched {
            tracing::debug!("'{}' matched after {} blocks", label, wait.attempts());
            return Ok(message);
        }
    }

    tracing::warn!("Gave up on '{}' after {} blocks", label, wait.attempts());
    Err(Error::EventTimeout {
        event: label.to_string(),
        attempts: wait.attempts(),
    })
}
