//! Configuration and log file locations
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/ami-lifecycle/`
//! - macOS: `~/Library/Application Support/ami-lifecycle/`
//! - Windows: `%APPDATA%\ami-lifecycle\`

use std::path::PathBuf;

/// Application directory name
const APP_NAME: &str = "ami-lifecycle";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_ends_with_file_name() {
        if let Some(path) = config_path() {
            assert!(path.ends_with("config.toml"));
        }
    }
}
