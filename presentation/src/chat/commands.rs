//! REPL input classification

/// What a line typed at the prompt asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Exit,
    Help,
    /// List tools and outstanding load errors
    Tools,
    /// Show the session key and turn count
    Session,
    /// Move the session record aside
    ResetSession,
    Unknown(String),
    /// Anything else is a request for the agent
    Request(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }

        match line.to_lowercase().as_str() {
            "exit" | "quit" | "bye" | "/exit" | "/quit" | "/q" => ReplCommand::Exit,
            "help" | "/help" | "/h" | "/?" => ReplCommand::Help,
            "/tools" => ReplCommand::Tools,
            "/session" => ReplCommand::Session,
            "/reset-session" => ReplCommand::ResetSession,
            _ if line.starts_with('/') => ReplCommand::Unknown(line.to_string()),
            _ => ReplCommand::Request(line.to_string()),
        }
    }
}
