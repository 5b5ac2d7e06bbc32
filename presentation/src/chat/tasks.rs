//! Non-interactive task execution (piped stdin and command-line query)

use agentsh_application::{AgentShell, ShellError};
use colored::Colorize;

/// Outcome counts of a [`run_tasks`] batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSummary {
    pub completed: usize,
    pub failed: usize,
}

/// Piped input first, then the command-line query; blanks are dropped.
pub fn collect_tasks(piped: Option<&str>, query: Option<&str>) -> Vec<String> {
    [piped, query]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|task| !task.is_empty())
        .map(str::to_string)
        .collect()
}

/// Run tasks in order. A failed task is reported and the next one still runs.
pub async fn run_tasks(shell: &AgentShell, tasks: &[String]) -> TaskSummary {
    let mut summary = TaskSummary::default();
    let total = tasks.len();

    for (i, task) in tasks.iter().enumerate() {
        if total > 1 {
            println!();
            println!("{} {}", format!("Task {}/{}:", i + 1, total).bold(), task);
        }

        match shell.handle(task).await {
            Ok(_) => summary.completed += 1,
            Err(e) => {
                report_shell_error(&e);
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Print a failed turn in red, with a hint for a damaged session record.
pub fn report_shell_error(error: &ShellError) {
    eprintln!("{} {}", "Error:".red().bold(), error.to_string().red());
    if error.is_session_corruption() {
        eprintln!(
            "{}",
            "The session record cannot be read. Use /reset-session in the REPL to move it aside."
                .yellow()
        );
    }
}
