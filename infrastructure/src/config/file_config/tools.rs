//! Tools configuration from TOML (`[tools]` section)
//!
//! ```toml
//! [tools]
//! dir = "./tools"
//! watch = true
//! debounce_ms = 300
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Raw tools configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    /// Directory scanned for tool-definition units
    pub dir: PathBuf,
    /// Reload tools when the directory changes
    pub watch: bool,
    /// Quiet period before a changed file is reloaded
    pub debounce_ms: u64,
}

impl Default for FileToolsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./tools"),
            watch: true,
            debounce_ms: 300,
        }
    }
}

impl FileToolsConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
