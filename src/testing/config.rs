//! Test scenario configuration types
//!
//! Defines the data structures for deserializing YAML lifecycle scenarios.

use serde::Deserialize;
use std::path::Path;

use crate::ami::Message;
use crate::common::{Error, Result};
use crate::lifecycle::{EntityKind, LifecyclePlan};

/// A complete lifecycle scenario loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    pub description: Option<String>,
    /// Entity kind prefix, e.g. `OutCampaign`
    pub entity: EntityKind,
    /// Create parameters, sent in file order
    pub create: Message,
    /// Create parameters the creation event must echo (default: all)
    pub echo: Option<Vec<String>>,
    /// Optional update applied before deletion
    pub update: Option<Message>,
    /// Delete the entity if a later step fails
    #[serde(default = "default_cleanup")]
    pub cleanup_on_failure: bool,
    /// Overrides `correlation.strict` from the config file
    pub strict: Option<bool>,
    /// Overrides `correlation.max_attempts` from the config file
    pub max_attempts: Option<usize>,
}

fn default_cleanup() -> bool {
    true
}

impl TestScenario {
    /// Load and validate a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read test scenario '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse test scenario: {}", e)))?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if self.entity.prefix().trim().is_empty() {
            return Err(Error::Config("scenario entity must not be empty".to_string()));
        }
        if self.create.is_empty() {
            return Err(Error::Config(format!(
                "scenario '{}' has no create parameters",
                self.name
            )));
        }
        if let Some(echo) = &self.echo {
            if let Some(missing) = echo.iter().find(|f| !self.create.contains(f)) {
                return Err(Error::Config(format!(
                    "echo field '{}' is not a create parameter",
                    missing
                )));
            }
        }
        Ok(())
    }

    /// The built-in outbound campaign scenario
    pub fn campaign(name: &str, detail: &str, plan: &str, dlma: &str, queue: &str) -> Self {
        Self {
            name: "campaign lifecycle".to_string(),
            description: Some(
                "Create a campaign, see it listed, delete it, see it gone".to_string(),
            ),
            entity: EntityKind::out_campaign(),
            create: Message::from_pairs([
                ("Name", name),
                ("Detail", detail),
                ("Plan", plan),
                ("Dlma", dlma),
                ("Queue", queue),
            ]),
            echo: Some(vec![
                "Name".to_string(),
                "Detail".to_string(),
                "Plan".to_string(),
            ]),
            update: None,
            cleanup_on_failure: true,
            strict: None,
            max_attempts: None,
        }
    }

    /// Lifecycle plan described by this scenario
    pub fn plan(&self) -> LifecyclePlan {
        let mut plan = LifecyclePlan::new(self.entity.clone(), self.create.clone());
        if let Some(echo) = &self.echo {
            plan = plan.with_echo(echo.iter().cloned());
        }
        if let Some(update) = &self.update {
            plan = plan.with_update(update.clone());
        }
        plan
    }
}
