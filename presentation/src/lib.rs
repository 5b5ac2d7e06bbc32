//! Presentation layer for agentsh
//!
//! This crate contains CLI definitions, the interactive REPL, the one-shot
//! task runner, console rendering of shell events and system prompt assembly.

pub mod chat;
pub mod cli;
pub mod output;
pub mod prompt;

// Re-export commonly used types
pub use chat::{ReplCommand, ShellRepl, TaskSummary, collect_tasks, report_shell_error, run_tasks};
pub use cli::commands::Cli;
pub use output::console::{ConsoleSink, format_duration};
pub use prompt::{RuntimeEnvironment, SystemPromptBuilder};
