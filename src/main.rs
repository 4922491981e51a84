//! ami-lifecycle - entity lifecycle checks over the Asterisk Manager Interface
//!
//! Connects to a manager, creates an entity, waits for its creation event,
//! confirms it is listed, deletes it and confirms it is gone.

use std::path::PathBuf;

use ami_lifecycle::common::{config::Config, logging};
use ami_lifecycle::{cli, commands};
use clap::Parser;
use commands::{Commands, ConnectionArgs};

#[derive(Parser)]
#[command(name = "ami-lifecycle", about = "Entity lifecycle checks over AMI")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every block sent and received
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_cli(cli.verbose, config.logging.file.as_deref());

    match cli::dispatch(cli.command, &cli.connection, &config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
