//! Interactive shell module
//!
//! Provides the readline-based REPL and the one-shot task runner.

mod commands;
mod repl;
mod tasks;

pub use commands::ReplCommand;
pub use repl::ShellRepl;
pub use tasks::{TaskSummary, collect_tasks, report_shell_error, run_tasks};
