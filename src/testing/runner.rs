//! Scenario runner
//!
//! Drives a [`LifecycleVerifier`] through a scenario on an open client,
//! prints progress, and deletes the entity again when a run fails after the
//! server has assigned it a Uuid.

use colored::Colorize;
use serde::Serialize;

use crate::ami::{Action, ManagerClient, WireSession};
use crate::common::ScenarioFailure;
use crate::lifecycle::{LifecycleVerifier, Operation, Step};

use super::config::TestScenario;

/// Knobs the caller resolves from config and flags
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Match events on echoed business keys
    pub strict: bool,
    /// Suppress progress output
    pub quiet: bool,
}

/// Result of a test run
#[derive(Debug, Serialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub steps: Vec<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ScenarioFailure>,
    /// Whether a cleanup delete was sent after a failure
    pub cleaned_up: bool,
}

/// Run one scenario on an authenticated client
pub async fn run_scenario<S: WireSession>(
    client: &mut ManagerClient<S>,
    scenario: &TestScenario,
    options: &RunOptions,
) -> TestResult {
    if !options.quiet {
        println!(
            "\n{} {}",
            "Running Test:".blue().bold(),
            scenario.name.white().bold()
        );
        if let Some(desc) = &scenario.description {
            println!("  {}", desc.dimmed());
        }
        println!("\n{}", "Steps:".cyan());
    }

    let strict = scenario.strict.unwrap_or(options.strict);
    let plan = scenario.plan();

    let mut verifier = LifecycleVerifier::new(client, scenario.entity.clone()).strict(strict);
    let outcome = verifier.run(&plan).await;
    let steps = verifier.completed().to_vec();
    let uuid = verifier.entity_uuid().map(str::to_string);
    drop(verifier);

    if !options.quiet {
        for (i, step) in steps.iter().enumerate() {
            println!("  {} Step {}: {}", "✓".green(), i + 1, step.to_string().dimmed());
        }
    }

    match outcome {
        Ok(report) => {
            if !options.quiet {
                println!(
                    "\n{} {} ({} {})\n",
                    "✓".green().bold(),
                    "Test Passed".green().bold(),
                    report.entity,
                    report.uuid.dimmed()
                );
            }
            TestResult {
                name: scenario.name.clone(),
                passed: true,
                steps,
                uuid: Some(report.uuid),
                failure: None,
                cleaned_up: false,
            }
        }
        Err(e) => {
            if !options.quiet {
                println!("  {} Step {}: {}", "✗".red(), steps.len() + 1, e);
                for message in e.payload() {
                    println!("      {}", message.to_string().dimmed());
                }
            }

            let needs_cleanup = scenario.cleanup_on_failure && !steps.contains(&Step::Delete);
            let cleaned_up = match (&uuid, needs_cleanup) {
                (Some(uuid), true) if !client.is_closed() => {
                    cleanup(client, scenario, uuid, options.quiet).await
                }
                _ => false,
            };

            if !options.quiet {
                println!("\n{} {}\n", "✗".red().bold(), "Test Failed".red().bold());
            }
            TestResult {
                name: scenario.name.clone(),
                passed: false,
                steps,
                uuid,
                failure: Some(ScenarioFailure::from(&e)),
                cleaned_up,
            }
        }
    }
}

/// Best-effort delete of an entity left behind by a failed run
async fn cleanup<S: WireSession>(
    client: &mut ManagerClient<S>,
    scenario: &TestScenario,
    uuid: &str,
    quiet: bool,
) -> bool {
    let action = Action::new(scenario.entity.action(Operation::Delete)).param("Uuid", uuid);
    match client.send(&action).await {
        Ok(reply) if reply.is_success() => {
            if !quiet {
                println!("  {} cleanup: deleted {}", "↺".yellow(), uuid.dimmed());
            }
            true
        }
        Ok(reply) => {
            tracing::warn!("Cleanup of {} rejected: {}", uuid, reply);
            false
        }
        Err(e) => {
            tracing::warn!("Cleanup of {} failed: {}", uuid, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ami::{MemorySession, Message};

    fn quiet() -> RunOptions {
        RunOptions {
            strict: false,
            quiet: true,
        }
    }

    #[tokio::test]
    async fn test_failure_after_create_triggers_cleanup() {
        let session = MemorySession::new()
            .then(Message::from_pairs([("Response", "Success")]))
            .then(Message::from_pairs([
                ("Event", "OutCampaignCreate"),
                ("Uuid", "u-1"),
                ("Name", "TestCamp"),
                ("Detail", "TestDetail"),
                ("Plan", "p"),
            ]))
            // listing without the new campaign
            .then(Message::from_pairs([("Response", "Error"), ("Message", "none")]))
            // cleanup delete reply
            .then(Message::from_pairs([("Response", "Success")]));
        let mut client = ManagerClient::new(session);

        let scenario = TestScenario::campaign("TestCamp", "TestDetail", "p", "d", "q");
        let result = run_scenario(&mut client, &scenario, &quiet()).await;

        assert!(!result.passed);
        assert_eq!(result.uuid.as_deref(), Some("u-1"));
        assert_eq!(result.steps, [Step::Create, Step::ConfirmCreated]);
        assert_eq!(result.failure.as_ref().map(|f| f.code.as_str()), Some("VERIFICATION"));
        assert!(result.cleaned_up);
        assert_eq!(
            client.session().sent().last().map(String::as_str),
            Some("Action: OutCampaignDelete\r\nUuid: u-1\r\n\r\n")
        );
    }

    #[tokio::test]
    async fn test_no_cleanup_without_uuid() {
        let session =
            MemorySession::new().then(Message::from_pairs([("Response", "Error")]));
        let mut client = ManagerClient::new(session);

        let scenario = TestScenario::campaign("TestCamp", "TestDetail", "p", "d", "q");
        let result = run_scenario(&mut client, &scenario, &quiet()).await;

        assert!(!result.passed);
        assert!(!result.cleaned_up);
        assert_eq!(client.session().sent().len(), 1);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["failure"]["code"], "ACTION_REJECTED");
    }
}
