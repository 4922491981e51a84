//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ami::{ListFraming, DEFAULT_EVENT_ATTEMPTS};

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Manager connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Event correlation settings
    #[serde(default)]
    pub correlation: CorrelationConfig,

    /// Listing reply framing
    #[serde(default)]
    pub listing: ListingConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where and as whom to connect
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub secret: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: String::new(),
            secret: String::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5038
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Timeout for establishing the TCP connection
    #[serde(default = "default_connect")]
    pub connect_secs: u64,

    /// Timeout for any single block read; 0 disables it
    #[serde(default = "default_read")]
    pub read_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: default_connect(),
            read_secs: default_read(),
        }
    }
}

fn default_connect() -> u64 {
    5
}
fn default_read() -> u64 {
    10
}

impl Timeouts {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn read(&self) -> Option<Duration> {
        (self.read_secs > 0).then(|| Duration::from_secs(self.read_secs))
    }
}

/// Event correlation settings
#[derive(Debug, Deserialize)]
pub struct CorrelationConfig {
    /// Blocks read while waiting for one event
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Match events on echoed business keys as well as their name
    #[serde(default)]
    pub strict: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            strict: false,
        }
    }
}

fn default_max_attempts() -> usize {
    DEFAULT_EVENT_ATTEMPTS
}

/// Listing reply framing
#[derive(Debug, Deserialize, Default)]
pub struct ListingConfig {
    #[serde(default)]
    pub framing: ListFraming,
}

/// Log output settings
#[derive(Debug, Deserialize, Default)]
pub struct LoggingConfig {
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.timeouts.connect_secs == 0 {
            return Err(super::Error::Config(
                "timeouts.connect_secs must be greater than zero".to_string(),
            ));
        }
        if let ListFraming::FixedCount(0) = self.listing.framing {
            return Err(super::Error::Config(
                "listing.framing fixed_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
