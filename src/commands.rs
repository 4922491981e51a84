//! CLI command definitions
//!
//! Defines the clap commands for the ami-lifecycle CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Connection overrides; anything left out comes from the config file
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Manager host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Manager port (default: 5038)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Manager login name
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Manager login secret
    #[arg(long, short = 's', global = true)]
    pub secret: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a lifecycle scenario from a YAML file
    Run {
        /// Path to the scenario file
        scenario: PathBuf,

        /// Print the result as JSON instead of progress lines
        #[arg(long)]
        json: bool,

        /// Match events on echoed business keys, not only their name
        #[arg(long)]
        strict: bool,
    },

    /// Run the built-in outbound campaign lifecycle
    Campaign {
        /// Campaign name
        #[arg(long, default_value = "TestCamp")]
        name: String,

        /// Campaign detail
        #[arg(long, default_value = "TestDetail")]
        detail: String,

        /// Plan Uuid the campaign dials with
        #[arg(long, default_value = "5ad6c7d8-535c-4cd3-b3e5-83ab420dcb56")]
        plan: String,

        /// Dial list master Uuid
        #[arg(long, default_value = "e276d8be-a558-4546-948a-f99913a7fea2")]
        dlma: String,

        /// Queue Uuid
        #[arg(long, default_value = "1c8eeabb-1dbc-4b75-a688-dd5b79b5afc6")]
        queue: String,

        /// Print the result as JSON instead of progress lines
        #[arg(long)]
        json: bool,

        /// Match events on echoed business keys, not only their name
        #[arg(long)]
        strict: bool,
    },

    /// Print the listing for an entity kind
    Show {
        /// Entity kind prefix, e.g. OutCampaign
        entity: String,

        /// Only this entity
        #[arg(long)]
        uuid: Option<String>,
    },
}
