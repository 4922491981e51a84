//! CLI command handling
//!
//! Opens the manager session, runs the requested command and prints its
//! result.

use crate::ami::{session, Action, ManagerClient, TcpSession};
use crate::commands::{Commands, ConnectionArgs};
use crate::common::config::Config;
use crate::common::Result;
use crate::lifecycle::{EntityKind, Operation};
use crate::testing::{run_scenario, RunOptions, TestResult, TestScenario};

/// Connection settings after applying flag overrides to the config file
#[derive(Debug, Clone)]
struct Target {
    host: String,
    port: u16,
    username: String,
    secret: String,
}

fn resolve_target(config: &Config, args: &ConnectionArgs) -> Target {
    let conn = &config.connection;
    Target {
        host: args.host.clone().unwrap_or_else(|| conn.host.clone()),
        port: args.port.unwrap_or(conn.port),
        username: args.username.clone().unwrap_or_else(|| conn.username.clone()),
        secret: args.secret.clone().unwrap_or_else(|| conn.secret.clone()),
    }
}

async fn connect(
    config: &Config,
    target: &Target,
    event_attempts: usize,
) -> Result<ManagerClient<TcpSession>> {
    let session = session::connect(
        &target.host,
        target.port,
        config.timeouts.connect(),
        config.timeouts.read(),
        config.listing.framing.clone(),
    )
    .await?;

    let mut client = ManagerClient::new(session).with_event_attempts(event_attempts);
    if !target.username.is_empty() {
        client.login(&target.username, &target.secret).await?;
    }
    Ok(client)
}

async fn run_and_report(
    config: &Config,
    target: &Target,
    scenario: &TestScenario,
    json: bool,
    strict: bool,
) -> Result<bool> {
    let attempts = scenario
        .max_attempts
        .unwrap_or(config.correlation.max_attempts);
    let mut client = connect(config, target, attempts).await?;

    let options = RunOptions {
        strict: strict || config.correlation.strict,
        quiet: json,
    };
    let result: TestResult = run_scenario(&mut client, scenario, &options).await;

    if let Err(e) = client.logoff().await {
        tracing::debug!("Logoff failed: {}", e);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(result.passed)
}

/// Dispatch a CLI command; `Ok(false)` means a scenario ran and failed
pub async fn dispatch(command: Commands, args: &ConnectionArgs, config: &Config) -> Result<bool> {
    let target = resolve_target(config, args);

    match command {
        Commands::Run {
            scenario,
            json,
            strict,
        } => {
            let scenario = TestScenario::load(&scenario)?;
            run_and_report(config, &target, &scenario, json, strict).await
        }

        Commands::Campaign {
            name,
            detail,
            plan,
            dlma,
            queue,
            json,
            strict,
        } => {
            let scenario = TestScenario::campaign(&name, &detail, &plan, &dlma, &queue);
            run_and_report(config, &target, &scenario, json, strict).await
        }

        Commands::Show { entity, uuid } => {
            let mut client = connect(config, &target, config.correlation.max_attempts).await?;

            let mut action = Action::new(EntityKind::new(entity).action(Operation::Show));
            if let Some(uuid) = uuid {
                action = action.param("Uuid", uuid);
            }
            let listing = client.send_list(&action).await?;
            for message in &listing {
                for (k, v) in message.iter() {
                    println!("{}: {}", k, v);
                }
                println!();
            }

            if let Err(e) = client.logoff().await {
                tracing::debug!("Logoff failed: {}", e);
            }
            Ok(true)
        }
    }
}
