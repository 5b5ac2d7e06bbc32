//! REPL configuration from TOML (`[repl]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw REPL configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReplConfig {
    /// Path to history file (default: `<data_dir>/agentsh/history.txt`)
    pub history_file: Option<String>,
    /// Show the banner when the REPL starts
    pub show_welcome: bool,
}

impl Default for FileReplConfig {
    fn default() -> Self {
        Self {
            history_file: None,
            show_welcome: true,
        }
    }
}

impl FileReplConfig {
    /// Resolved history path; an empty setting falls back to the data dir.
    pub fn history_path(&self) -> Option<PathBuf> {
        match self.history_file.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => dirs::data_dir().map(|d| d.join("agentsh").join("history.txt")),
        }
    }
}
