//! In-memory session with a scripted inbound stream
//!
//! Inbound blocks are queued up front and handed out in order; outbound
//! blocks are recorded. Reading past the end of the script behaves like
//! the server hanging up.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::common::{Error, Result};

use super::codec::LINE_END;
use super::framing::ListFraming;
use super::message::Message;
use super::session::WireSession;

#[derive(Debug, Default)]
pub struct MemorySession {
    inbound: VecDeque<String>,
    sent: Vec<String>,
    reads: usize,
    closed: bool,
    framing: ListFraming,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_framing(mut self, framing: ListFraming) -> Self {
        self.framing = framing;
        self
    }

    /// Queue a raw inbound block
    pub fn push_raw(&mut self, block: impl Into<String>) {
        self.inbound.push_back(block.into());
    }

    /// Queue a message as an inbound block
    pub fn push(&mut self, message: &Message) {
        let mut block = String::new();
        for (k, v) in message.iter() {
            block.push_str(k);
            block.push_str(": ");
            block.push_str(v);
            block.push_str(LINE_END);
        }
        self.inbound.push_back(block);
    }

    /// Builder form of [`MemorySession::push`]
    pub fn then(mut self, message: Message) -> Self {
        self.push(&message);
        self
    }

    /// Outbound blocks in the order they were written
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Number of inbound blocks consumed so far
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Inbound blocks not yet consumed
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }
}

#[async_trait]
impl WireSession for MemorySession {
    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn send_block(&mut self, block: &str) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        self.sent.push(block.to_string());
        Ok(())
    }

    async fn read_block(&mut self) -> Result<String> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        match self.inbound.pop_front() {
            Some(block) => {
                self.reads += 1;
                Ok(block)
            }
            None => {
                self.closed = true;
                Err(Error::SessionClosed)
            }
        }
    }

    fn list_framing(&self) -> &ListFraming {
        &self.framing
    }
}
