//! System prompt assembly
//!
//! The base prompt comes from `.prompt` in the working directory, else
//! `README.md`, else a built-in text. A runtime-environment section follows,
//! then `SYSTEM_PROMPT` from the environment if set.

use std::path::{Path, PathBuf};

/// Files tried in order for the base prompt
pub const PROMPT_FILES: [&str; 2] = [".prompt", "README.md"];

pub const BUILTIN_PROMPT: &str = "You are an agent running inside agentsh, a command shell.

Use the available tools to accomplish the user's requests. Tools are defined
by files in the tools directory and can change between requests, so rely on
the tool list you are given for each request rather than on earlier ones.

Response style:
- Be helpful and concise
- Confirm what each tool call did
- Ask for clarification when a request is ambiguous";

/// Facts about the running shell, appended to every prompt
#[derive(Debug, Clone)]
pub struct RuntimeEnvironment {
    pub tools_dir: PathBuf,
    pub hot_reload: bool,
    pub session_key: String,
    pub provider: String,
    pub working_dir: PathBuf,
}

impl RuntimeEnvironment {
    fn render(&self) -> String {
        format!(
            "## Runtime Environment\n\
             - Tools directory: {}\n\
             - Hot reload: {}\n\
             - Session: {}\n\
             - Provider: {}\n\
             - Working directory: {}",
            self.tools_dir.display(),
            if self.hot_reload { "on" } else { "off" },
            self.session_key,
            self.provider,
            self.working_dir.display()
        )
    }
}

/// Builder for the system prompt handed to the runtime
pub struct SystemPromptBuilder {
    base_dir: PathBuf,
    environment: RuntimeEnvironment,
    extra: Option<String>,
}

impl SystemPromptBuilder {
    /// Look for prompt files in `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>, environment: RuntimeEnvironment) -> Self {
        Self {
            base_dir: base_dir.into(),
            environment,
            extra: None,
        }
    }

    /// Text appended after the environment section (`SYSTEM_PROMPT`)
    pub fn with_extra(mut self, extra: Option<String>) -> Self {
        self.extra = extra.filter(|e| !e.trim().is_empty());
        self
    }

    pub fn build(&self) -> String {
        let base = match read_prompt_file(&self.base_dir) {
            Some((name, content)) => {
                tracing::info!(file = %name, "Loaded system prompt");
                format!("[Loaded system prompt from: {}]\n\n{}", name, content.trim())
            }
            None => BUILTIN_PROMPT.to_string(),
        };

        let mut prompt = format!("{}\n\n{}", base, self.environment.render());
        if let Some(extra) = &self.extra {
            prompt.push_str("\n\n");
            prompt.push_str(extra.trim());
        }
        prompt
    }
}

/// First readable, non-empty prompt file as `(file name, content)`
fn read_prompt_file(dir: &Path) -> Option<(String, String)> {
    PROMPT_FILES.iter().find_map(|name| {
        let path = dir.join(name);
        if !path.is_file() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) if !content.trim().is_empty() => Some((name.to_string(), content)),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Prompt file not readable");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn environment() -> RuntimeEnvironment {
        RuntimeEnvironment {
            tools_dir: PathBuf::from("./tools"),
            hot_reload: true,
            session_key: "agentsh-2026-10-19-14".into(),
            provider: "echo".into(),
            working_dir: PathBuf::from("/work"),
        }
    }

    #[test]
    fn test_builtin_prompt_when_no_files() {
        let dir = TempDir::new().unwrap();
        let prompt = SystemPromptBuilder::new(dir.path(), environment()).build();

        assert!(prompt.starts_with(BUILTIN_PROMPT));
        assert!(prompt.contains("- Hot reload: on"));
        assert!(prompt.contains("- Session: agentsh-2026-10-19-14"));
        assert!(!prompt.contains("[Loaded system prompt from:"));
    }

    #[test]
    fn test_prompt_file_wins_over_readme() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".prompt"), "Be a pirate.\n").unwrap();
        std::fs::write(dir.path().join("README.md"), "# Project\n").unwrap();

        let prompt = SystemPromptBuilder::new(dir.path(), environment()).build();
        assert!(prompt.starts_with("[Loaded system prompt from: .prompt]\n\nBe a pirate."));
        assert!(!prompt.contains("# Project"));
    }

    #[test]
    fn test_readme_fallback() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "# Project\nDetails").unwrap();

        let prompt = SystemPromptBuilder::new(dir.path(), environment()).build();
        assert!(prompt.starts_with("[Loaded system prompt from: README.md]"));
    }

    #[test]
    fn test_empty_prompt_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".prompt"), "  \n").unwrap();

        let prompt = SystemPromptBuilder::new(dir.path(), environment()).build();
        assert!(prompt.starts_with(BUILTIN_PROMPT));
    }

    #[test]
    fn test_extra_appended_last() {
        let dir = TempDir::new().unwrap();
        let prompt = SystemPromptBuilder::new(dir.path(), environment())
            .with_extra(Some("Always answer in French.".into()))
            .build();

        assert!(prompt.ends_with("Always answer in French."));
        let env_at = prompt.find("## Runtime Environment").unwrap();
        let extra_at = prompt.find("Always answer").unwrap();
        assert!(env_at < extra_at);
    }

    #[test]
    fn test_blank_extra_ignored() {
        let dir = TempDir::new().unwrap();
        let prompt = SystemPromptBuilder::new(dir.path(), environment())
            .with_extra(Some("   ".into()))
            .build();
        assert!(prompt.ends_with("- Working directory: /work"));
    }
}
