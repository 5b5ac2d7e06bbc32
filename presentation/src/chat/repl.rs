//! REPL (Read-Eval-Print Loop) for the agent shell

use super::commands::ReplCommand;
use super::tasks::report_shell_error;
use agentsh_application::AgentShell;
use agentsh_domain::{ToolLoadError, ToolSnapshot};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;
use std::sync::Arc;

const PROMPT: &str = "# ";

/// Interactive shell REPL
pub struct ShellRepl {
    shell: Arc<AgentShell>,
    history_path: Option<PathBuf>,
    show_welcome: bool,
    tools_dir: PathBuf,
    hot_reload: bool,
}

impl ShellRepl {
    pub fn new(shell: Arc<AgentShell>) -> Self {
        Self {
            shell,
            history_path: dirs::data_dir().map(|p| p.join("agentsh").join("history.txt")),
            show_welcome: true,
            tools_dir: PathBuf::from("./tools"),
            hot_reload: true,
        }
    }

    pub fn with_history_file(mut self, path: Option<PathBuf>) -> Self {
        self.history_path = path;
        self
    }

    pub fn with_welcome(mut self, show: bool) -> Self {
        self.show_welcome = show;
        self
    }

    /// Tools directory shown in the banner and whether it is watched
    pub fn with_tools_dir(mut self, dir: impl Into<PathBuf>, hot_reload: bool) -> Self {
        self.tools_dir = dir.into();
        self.hot_reload = hot_reload;
        self
    }

    /// Run the interactive REPL.
    ///
    /// Needs the multi-threaded tokio runtime: the blocking readline call is
    /// moved off the worker so watcher reloads keep running at the prompt.
    pub async fn run(&self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        if let Some(ref path) = self.history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        if self.show_welcome {
            self.print_welcome().await;
        }

        loop {
            println!();
            let readline = tokio::task::block_in_place(|| rl.readline(PROMPT));

            match readline {
                Ok(line) => {
                    let command = ReplCommand::parse(&line);
                    if command != ReplCommand::Empty {
                        let _ = rl.add_history_entry(line.trim());
                    }

                    match command {
                        ReplCommand::Empty => continue,
                        ReplCommand::Exit => {
                            println!("{}", "Goodbye!".bold());
                            break;
                        }
                        ReplCommand::Help => print_help(),
                        ReplCommand::Tools => self.print_tools(),
                        ReplCommand::Session => self.print_session().await,
                        ReplCommand::ResetSession => self.reset_session().await,
                        ReplCommand::Unknown(cmd) => {
                            println!("Unknown command: {}", cmd);
                            println!("Type /help for available commands");
                        }
                        ReplCommand::Request(request) => self.process_request(&request).await,
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                    println!("{}", "Interrupted".yellow());
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "Goodbye!".bold());
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    /// Run one request; Ctrl-C abandons it without saving anything.
    async fn process_request(&self, request: &str) {
        tokio::select! {
            result = self.shell.handle(request) => {
                if let Err(e) = result {
                    report_shell_error(&e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                eprintln!("{}", "Request interrupted, nothing was saved".yellow());
            }
        }
    }

    async fn print_welcome(&self) {
        let snapshot = self.shell.tools().snapshot();
        let runtime = match self.shell.runtime_model() {
            Some(model) => format!("{} ({})", self.shell.runtime_name(), model),
            None => self.shell.runtime_name().to_string(),
        };

        println!();
        println!("{}", "╭─────────────────────────────────────────────╮".cyan());
        println!("{}", "│              agentsh - Agent Shell          │".cyan());
        println!("{}", "╰─────────────────────────────────────────────╯".cyan());
        println!();
        println!("{} {}", "Runtime:".bold(), runtime);
        println!(
            "{} {} from {} (hot reload {})",
            "Tools:".bold(),
            snapshot.len(),
            self.tools_dir.display(),
            if self.hot_reload { "on" } else { "off" }
        );
        match self.shell.session_summary().await {
            Ok(summary) if summary.turns > 0 => println!(
                "{} {} ({} earlier exchanges)",
                "Session:".bold(),
                summary.key,
                summary.exchanges
            ),
            Ok(summary) => println!("{} {}", "Session:".bold(), summary.key),
            Err(e) => report_shell_error(&e),
        }
        println!();
        println!(
            "{} Tool files in {} are picked up while the shell runs",
            "Tip:".yellow(),
            self.tools_dir.display()
        );
        println!("Type 'exit', 'quit', or 'bye' to quit, 'help' for commands, or press Ctrl+C");
    }

    fn print_tools(&self) {
        let snapshot = self.shell.tools().snapshot();
        let errors = self.shell.tools().load_errors();
        println!();
        print!("{}", format_tool_list(&snapshot, &errors));
    }

    async fn print_session(&self) {
        match self.shell.session_summary().await {
            Ok(summary) => {
                println!();
                println!("{} {}", "Session:".bold(), summary.key);
                println!("  Turns:     {}", summary.turns);
                println!("  Exchanges: {}", summary.exchanges);
            }
            Err(e) => report_shell_error(&e),
        }
    }

    async fn reset_session(&self) {
        match self.shell.reset_session().await {
            Ok(true) => println!(
                "{} {}",
                "Session record moved aside; starting fresh as".green(),
                self.shell.key()
            ),
            Ok(false) => println!("Session {} has no record yet", self.shell.key()),
            Err(e) => report_shell_error(&e),
        }
    }
}

fn print_help() {
    println!();
    println!("{}", "Available Commands:".bold().cyan());
    println!("  /tools          - List the current tools and load errors");
    println!("  /session        - Show the session key and turn count");
    println!("  /reset-session  - Move the session record aside and start fresh");
    println!("  help, /help     - Show this help message");
    println!("  exit, quit, bye - Exit the shell");
    println!();
    println!("Anything else is sent to the agent. Ctrl+C during a request cancels it.");
}

/// `/tools` output: one line per tool, then outstanding load errors
pub fn format_tool_list(snapshot: &ToolSnapshot, errors: &[ToolLoadError]) -> String {
    let mut out = format!(
        "{} (generation {})\n",
        format!("Tools: {}", snapshot.len()).bold(),
        snapshot.generation()
    );
    if snapshot.is_empty() {
        out.push_str("  (none)\n");
    }
    for definition in snapshot.definitions() {
        out.push_str(&format!(
            "  {} - {}\n",
            definition.name.cyan(),
            definition.description
        ));
    }
    if !errors.is_empty() {
        out.push_str(&format!("{}\n", format!("Load errors: {}", errors.len()).red()));
        for error in errors {
            out.push_str(&format!("  {}\n", error));
        }
    }
    out
}
