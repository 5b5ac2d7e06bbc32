//! Session configuration from TOML (`[session]` and `[logging]` sections)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw session configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    /// Prefix of hour-bucketed session keys
    pub prefix: String,
    /// Directory holding `<key>.session.json` records
    pub dir: PathBuf,
}

impl Default for FileSessionConfig {
    fn default() -> Self {
        Self {
            prefix: "agentsh".to_string(),
            dir: PathBuf::from("./sessions"),
        }
    }
}

/// Raw logging configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for the daily rolling log file; no file log when unset
    pub dir: Option<PathBuf>,
    /// Default filter when no `-v` flag or `RUST_LOG` is given
    pub level: String,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            level: "warn".to_string(),
        }
    }
}

impl FileLoggingConfig {
    /// Log directory, treating an empty setting as unset
    pub fn log_dir(&self) -> Option<&PathBuf> {
        self.dir.as_ref().filter(|d| !d.as_os_str().is_empty())
    }
}
