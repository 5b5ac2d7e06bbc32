//! Configuration file loading for agentsh
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `AGENTSH_*` environment variables (`AGENTSH_RUNTIME__MODEL=...`)
//! 2. `MODEL_PROVIDER`
//! 3. `--config <path>` specified file
//! 4. Project root: `./agentsh.toml` or `./.agentsh.toml`
//! 5. Global: `$XDG_CONFIG_HOME/agentsh/config.toml`
//! 6. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileLoggingConfig, FileReplConfig, FileRuntimeConfig,
    FileSessionConfig, FileToolsConfig, RuntimeProvider,
};
pub use loader::ConfigLoader;
