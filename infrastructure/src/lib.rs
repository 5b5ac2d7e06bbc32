//! Infrastructure layer for agentsh
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the hot-reloading tool registry and its directory
//! watcher, file-backed sessions, reasoning runtimes, configuration file
//! loading and logging setup.

pub mod config;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod tools;
pub mod watcher;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileLoggingConfig, FileReplConfig,
    FileRuntimeConfig, FileSessionConfig, FileToolsConfig, RuntimeProvider,
};
pub use logging::init_logging;
pub use runtime::{AnthropicRuntime, ChatSettings, EchoRuntime, OpenAiRuntime, build_runtime};
pub use session::FileSessionStore;
pub use tools::{
    ChangeOutcome, CommandTool, CommandToolLoader, JsonSchemaToolConverter, LoadReport,
    ToolRegistry, ToolUnitLoader,
};
pub use watcher::{ChangeKind, DEFAULT_DEBOUNCE, ToolChange, ToolWatcher, WatcherError};
