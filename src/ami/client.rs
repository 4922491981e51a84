//! Manager client
//!
//! Sole owner of the session. Sending and waiting both take `&mut self`,
//! so a reply read and an event wait can never run concurrently on the
//! same inbound stream.

use std::collections::VecDeque;

use crate::common::{Error, Result};

use super::correlator::{self, DEFAULT_EVENT_ATTEMPTS};
use super::dispatcher;
use super::message::{Action, Message};
use super::session::WireSession;

pub struct ManagerClient<S> {
    session: S,
    /// Events that arrived while a reply was being read
    backlog: VecDeque<Message>,
    /// Attempt budget for event waits
    event_attempts: usize,
}

impl<S: WireSession> ManagerClient<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            backlog: VecDeque::new(),
            event_attempts: DEFAULT_EVENT_ATTEMPTS,
        }
    }

    pub fn with_event_attempts(mut self, attempts: usize) -> Self {
        self.event_attempts = attempts;
        self
    }

    pub fn event_attempts(&self) -> usize {
        self.event_attempts
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// Events parked while reading replies, oldest first
    pub fn backlog(&self) -> &VecDeque<Message> {
        &self.backlog
    }

    /// Send an action and return its reply
    pub async fn send(&mut self, action: &Action) -> Result<Message> {
        dispatcher::send(&mut self.session, &mut self.backlog, action).await
    }

    /// Send an action and collect its listing reply
    pub async fn send_list(&mut self, action: &Action) -> Result<Vec<Message>> {
        dispatcher::send_list(&mut self.session, &mut self.backlog, action).await
    }

    /// Wait for an event using the client's attempt budget
    pub async fn await_event<P>(&mut self, label: &str, predicate: P) -> Result<Message>
    where
        P: Fn(&Message) -> bool,
    {
        let attempts = self.event_attempts;
        self.await_event_within(label, predicate, attempts).await
    }

    /// Wait for an event with an explicit attempt budget
    pub async fn await_event_within<P>(
        &mut self,
        label: &str,
        predicate: P,
        max_attempts: usize,
    ) -> Result<Message>
    where
        P: Fn(&Message) -> bool,
    {
        correlator::await_event(
            &mut self.session,
            &mut self.backlog,
            label,
            predicate,
            max_attempts,
        )
        .await
    }

    /// Authenticate the session
    pub async fn login(&mut self, username: &str, secret: &str) -> Result<()> {
        let action = Action::new("Login")
            .param("Username", username)
            .param("Secret", secret);
        let reply = self.send(&action).await?;

        if !reply.is_success() {
            return Err(Error::LoginFailed(
                reply
                    .get("Message")
                    .unwrap_or("no reason given")
                    .to_string(),
            ));
        }
        tracing::info!("Logged in as '{}'", username);
        Ok(())
    }

    /// Say goodbye; the server answers and then drops the connection
    pub async fn logoff(&mut self) -> Result<()> {
        if self.session.is_closed() {
            return Ok(());
        }
        let reply = self.send(&Action::new("Logoff")).await?;
        tracing::debug!("Logoff reply: {}", reply);
        Ok(())
    }
}
