//! Remote entity kinds and the action names derived from them

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operations every managed entity kind supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Show,
}

impl Operation {
    fn suffix(self) -> &'static str {
        match self {
            Operation::Create => "Create",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
            Operation::Show => "Show",
        }
    }
}

/// Action/event name prefix of a remote entity, e.g. `OutCampaign`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKind(String);

impl EntityKind {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// Outbound campaign
    pub fn out_campaign() -> Self {
        Self::new("OutCampaign")
    }

    /// Dialing plan
    pub fn out_plan() -> Self {
        Self::new("OutPlan")
    }

    /// Dial list master
    pub fn out_dlma() -> Self {
        Self::new("OutDlma")
    }

    pub fn prefix(&self) -> &str {
        &self.0
    }

    /// Action name for `op`; the matching event has the same name
    pub fn action(&self, op: Operation) -> String {
        format!("{}{}", self.0, op.suffix())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        let kind = EntityKind::out_campaign();
        assert_eq!(kind.action(Operation::Create), "OutCampaignCreate");
        assert_eq!(kind.action(Operation::Update), "OutCampaignUpdate");
        assert_eq!(kind.action(Operation::Delete), "OutCampaignDelete");
        assert_eq!(kind.action(Operation::Show), "OutCampaignShow");
        assert_eq!(EntityKind::out_dlma().action(Operation::Show), "OutDlmaShow");
        assert_eq!(EntityKind::out_plan().action(Operation::Delete), "OutPlanDelete");
    }
}
