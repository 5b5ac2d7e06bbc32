//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for agentsh
#[derive(Parser, Debug)]
#[command(name = "agentsh")]
#[command(author, version, about = "Agent shell with hot-reloaded tools and hourly sessions")]
#[command(long_about = r#"
agentsh hands each request to a reasoning runtime together with the tools
found in the tools directory. Tool files are reloaded while the shell runs,
and every exchange is saved to an hour-bucketed session record.

Input modes:
  echo "task" | agentsh      Piped stdin runs as one task
  agentsh <words...>         Command-line words run as one task
  agentsh                    Interactive REPL

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./agentsh.toml      Project-level config
3. ~/.config/agentsh/config.toml   Global config

Example:
  agentsh "what tools do you have?"
  agentsh --provider anthropic "summarise ./notes.txt"
  agentsh --provider echo '!tool echo_tool {"text": "hi"}'
  agentsh --tools-dir ./my-tools --no-watch
"#)]
pub struct Cli {
    /// Request to run once (joined with spaces); starts the REPL when omitted
    #[arg(value_name = "QUERY")]
    pub query: Vec<String>,

    /// Runtime provider (openai, anthropic, openrouter, ollama, echo)
    #[arg(short, long, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Model identifier passed to the runtime
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Directory of tool-definition files
    #[arg(long, value_name = "DIR")]
    pub tools_dir: Option<PathBuf>,

    /// Directory of session records
    #[arg(long, value_name = "DIR")]
    pub sessions_dir: Option<PathBuf>,

    /// Session key prefix
    #[arg(long, value_name = "PREFIX")]
    pub session_prefix: Option<String>,

    /// Load tools once and do not watch for changes
    #[arg(long)]
    pub no_watch: bool,

    /// Print each reply only once it is complete
    #[arg(long)]
    pub no_stream: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// Command-line words joined into one request, if any
    pub fn query_text(&self) -> Option<String> {
        let text = self.query.join(" ");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}
