//! Entity lifecycle verification
//!
//! Drives one entity through create, confirm, list, (update), delete,
//! confirm, list, checking each reply and event against what was sent.
//! The first failing step ends the run; nothing is rolled back here, but
//! the discovered Uuid stays available through
//! [`LifecycleVerifier::entity_uuid`] so the caller can clean up.

use std::fmt;

use serde::Serialize;

use crate::ami::{Action, EventMatcher, ManagerClient, Message, WireSession};
use crate::common::{Error, Result};

use super::entity::{EntityKind, Operation};

/// A lifecycle step, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Create,
    ConfirmCreated,
    AssertPresent,
    Update,
    ConfirmUpdated,
    Delete,
    ConfirmDeleted,
    AssertAbsent,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Create => "create",
            Step::ConfirmCreated => "confirm_created",
            Step::AssertPresent => "assert_present",
            Step::Update => "update",
            Step::ConfirmUpdated => "confirm_updated",
            Step::Delete => "delete",
            Step::ConfirmDeleted => "confirm_deleted",
            Step::AssertAbsent => "assert_absent",
        };
        write!(f, "{}", name)
    }
}

/// What to create and what to expect back
#[derive(Debug, Clone)]
pub struct LifecyclePlan {
    pub entity: EntityKind,
    /// Create parameters, sent in this order
    pub params: Message,
    /// Parameters the creation event must echo unchanged
    pub echo: Vec<String>,
    /// Optional changes applied between listing and deletion
    pub update: Option<Message>,
}

impl LifecyclePlan {
    /// Plan echoing every create parameter
    pub fn new(entity: EntityKind, params: Message) -> Self {
        let echo = params.iter().map(|(k, _)| k.to_string()).collect();
        Self {
            entity,
            params,
            echo,
            update: None,
        }
    }

    pub fn with_echo<I, T>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.echo = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_update(mut self, changes: Message) -> Self {
        self.update = Some(changes);
        self
    }
}

/// Outcome of a fully passed run
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleReport {
    pub entity: EntityKind,
    pub uuid: String,
    pub steps: Vec<Step>,
}

/// Whether any message in a listing carries `uuid`
pub fn listing_contains(listing: &[Message], uuid: &str) -> bool {
    listing.iter().any(|m| m.uuid() == Some(uuid))
}

pub struct LifecycleVerifier<'c, S> {
    client: &'c mut ManagerClient<S>,
    entity: EntityKind,
    /// Also match events on echoed business keys, not just their name
    strict: bool,
    uuid: Option<String>,
    completed: Vec<Step>,
}

impl<'c, S: WireSession> LifecycleVerifier<'c, S> {
    pub fn new(client: &'c mut ManagerClient<S>, entity: EntityKind) -> Self {
        Self {
            client,
            entity,
            strict: false,
            uuid: None,
            completed: Vec::new(),
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Uuid assigned by the server, once the creation event was seen
    pub fn entity_uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    /// Steps that have passed so far
    pub fn completed(&self) -> &[Step] {
        &self.completed
    }

    async fn expect_success(&mut self, action: Action) -> Result<Message> {
        let reply = self.client.send(&action).await?;
        if !reply.is_success() {
            return Err(Error::action_rejected(&action.name, reply));
        }
        Ok(reply)
    }

    async fn listing(&mut self, uuid: &str) -> Result<Vec<Message>> {
        let action = Action::new(self.entity.action(Operation::Show)).param("Uuid", uuid);
        self.client.send_list(&action).await
    }

    async fn await_entity_event(&mut self, matcher: EventMatcher) -> Result<Message> {
        let label = matcher.event_name().to_string();
        self.client
            .await_event(&label, |m| matcher.matches(m))
            .await
    }

    fn pass(&mut self, step: Step) {
        tracing::info!("{} {}: ok", self.entity, step);
        self.completed.push(step);
    }

    /// Send `<Kind>Create` and require a `Success` reply
    pub async fn create(&mut self, params: &Message) -> Result<()> {
        let action = Action::with_params(self.entity.action(Operation::Create), params.clone());
        self.expect_success(action).await?;
        self.pass(Step::Create);
        Ok(())
    }

    /// Wait for the creation event and check it echoes `echo` from `params`
    ///
    /// Returns the server-assigned Uuid, which the verifier also retains.
    pub async fn confirm_created(&mut self, params: &Message, echo: &[String]) -> Result<String> {
        let step = Step::ConfirmCreated.to_string();

        let mut expected = Vec::with_capacity(echo.len());
        for field in echo {
            let value = params.get(field).ok_or_else(|| {
                Error::Config(format!("echo field '{}' is not a create parameter", field))
            })?;
            expected.push((field.as_str(), value));
        }

        let mut matcher = EventMatcher::event(self.entity.action(Operation::Create));
        if self.strict {
            for (field, value) in &expected {
                matcher = matcher.with_field(*field, *value);
            }
        }
        let event = self.await_entity_event(matcher).await?;

        for (field, value) in &expected {
            if event.get(field) != Some(*value) {
                return Err(Error::verification(
                    &step,
                    format!(
                        "field '{}' is {:?}, expected {:?}",
                        field,
                        event.get(field),
                        value
                    ),
                    vec![event],
                ));
            }
        }

        let uuid = event
            .uuid()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                Error::verification(&step, "creation event carries no Uuid", vec![event.clone()])
            })?
            .to_string();

        self.uuid = Some(uuid.clone());
        self.pass(Step::ConfirmCreated);
        Ok(uuid)
    }

    /// Require the listing for `uuid` to include it
    pub async fn assert_present(&mut self, uuid: &str) -> Result<()> {
        let listing = self.listing(uuid).await?;
        if !listing_contains(&listing, uuid) {
            return Err(Error::verification(
                &Step::AssertPresent.to_string(),
                format!("{} {} is not listed", self.entity, uuid),
                listing,
            ));
        }
        self.pass(Step::AssertPresent);
        Ok(())
    }

    /// Send `<Kind>Update` for `uuid` with `changes`
    pub async fn update(&mut self, uuid: &str, changes: &Message) -> Result<()> {
        let mut params = Message::new().with("Uuid", uuid);
        for (k, v) in changes.iter() {
            params.push(k, v);
        }
        let action = Action::with_params(self.entity.action(Operation::Update), params);
        self.expect_success(action).await?;
        self.pass(Step::Update);
        Ok(())
    }

    /// Wait for the update event for `uuid` and check it carries `changes`
    pub async fn confirm_updated(&mut self, uuid: &str, changes: &Message) -> Result<()> {
        let mut matcher = EventMatcher::event(self.entity.action(Operation::Update));
        if self.strict {
            matcher = matcher.with_field("Uuid", uuid);
        }
        let event = self.await_entity_event(matcher).await?;

        let step = Step::ConfirmUpdated.to_string();
        if event.uuid() != Some(uuid) {
            return Err(Error::verification(
                &step,
                format!("update event is for {:?}, expected {}", event.uuid(), uuid),
                vec![event],
            ));
        }
        for (field, value) in changes.iter() {
            if event.get(field) != Some(value) {
                return Err(Error::verification(
                    &step,
                    format!(
                        "field '{}' is {:?}, expected {:?}",
                        field,
                        event.get(field),
                        value
                    ),
                    vec![event],
                ));
            }
        }
        self.pass(Step::ConfirmUpdated);
        Ok(())
    }

    /// Send `<Kind>Delete` for `uuid` and require a `Success` reply
    pub async fn delete(&mut self, uuid: &str) -> Result<()> {
        let action = Action::new(self.entity.action(Operation::Delete)).param("Uuid", uuid);
        self.expect_success(action).await?;
        self.pass(Step::Delete);
        Ok(())
    }

    /// Wait for the deletion event and check it names `uuid`
    pub async fn confirm_deleted(&mut self, uuid: &str) -> Result<()> {
        let mut matcher = EventMatcher::event(self.entity.action(Operation::Delete));
        if self.strict {
            matcher = matcher.with_field("Uuid", uuid);
        }
        let event = self.await_entity_event(matcher).await?;

        if event.uuid() != Some(uuid) {
            return Err(Error::verification(
                &Step::ConfirmDeleted.to_string(),
                format!("deletion event is for {:?}, expected {}", event.uuid(), uuid),
                vec![event],
            ));
        }
        self.pass(Step::ConfirmDeleted);
        Ok(())
    }

    /// Require the listing for `uuid` to no longer include it
    pub async fn assert_absent(&mut self, uuid: &str) -> Result<()> {
        let listing = self.listing(uuid).await?;
        if listing_contains(&listing, uuid) {
            return Err(Error::verification(
                &Step::AssertAbsent.to_string(),
                format!("{} {} is still listed", self.entity, uuid),
                listing,
            ));
        }
        self.pass(Step::AssertAbsent);
        Ok(())
    }

    /// Run every step of `plan` in order, stopping at the first failure
    pub async fn run(&mut self, plan: &LifecyclePlan) -> Result<LifecycleReport> {
        if plan.entity != self.entity {
            return Err(Error::Internal(format!(
                "plan is for {}, verifier for {}",
                plan.entity, self.entity
            )));
        }

        self.create(&plan.params).await?;
        let uuid = self.confirm_created(&plan.params, &plan.echo).await?;
        self.assert_present(&uuid).await?;

        if let Some(changes) = &plan.update {
            self.update(&uuid, changes).await?;
            self.confirm_updated(&uuid, changes).await?;
        }

        self.delete(&uuid).await?;
        self.confirm_deleted(&uuid).await?;
        self.assert_absent(&uuid).await?;

        Ok(LifecycleReport {
            entity: self.entity.clone(),
            uuid,
            steps: self.completed.clone(),
        })
    }
}
