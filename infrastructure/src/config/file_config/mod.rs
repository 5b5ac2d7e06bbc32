//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section has defaults, so an empty file is a valid configuration.

mod repl;
mod runtime;
mod session;
mod tools;

pub use repl::FileReplConfig;
pub use runtime::{FileRuntimeConfig, RuntimeProvider};
pub use session::{FileLoggingConfig, FileSessionConfig};
pub use tools::FileToolsConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("runtime.request_timeout_secs cannot be 0")]
    InvalidTimeout,

    #[error("runtime.model cannot be empty for a provider without a default model")]
    EmptyModelName,

    #[error("runtime.max_tool_rounds cannot be 0")]
    InvalidToolRounds,

    #[error("unknown runtime provider '{0}' (expected openai, openrouter, ollama or echo)")]
    UnknownProvider(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub runtime: FileRuntimeConfig,
    pub tools: FileToolsConfig,
    pub session: FileSessionConfig,
    pub repl: FileReplConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.runtime.validate()
    }
}
