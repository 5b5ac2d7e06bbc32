//! Command tools: one TOML file per tool, wrapping a shell command template.
//!
//! Each unit declares a name, a description, an ordered parameter list and a
//! command with `{param_name}` placeholders.
//!
//! # Security
//!
//! All parameter values are shell-escaped before substitution to prevent
//! command injection: single-quote wrapping on Unix, double-quote wrapping
//! with character escaping on Windows.
//!
//! # Example Unit
//!
//! ```toml
//! name = "gh_create_issue"
//! description = "Create a GitHub issue"
//! command = "gh issue create --title {title} --body {body}"
//! timeout_secs = 30
//!
//! [[parameters]]
//! name = "title"
//! type = "string"
//! description = "Issue title"
//! required = true
//!
//! [[parameters]]
//! name = "body"
//! type = "string"
//! ```

use super::loader::ToolUnitLoader;
use agentsh_domain::{
    RegisteredTool, ToolCall, ToolDefinition, ToolError, ToolHandler, ToolLoadError,
    ToolParameter, ToolResult, ToolResultMetadata,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Maximum output size (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// On-disk shape of a command tool unit
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandToolFile {
    pub name: String,
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub parameters: Vec<CommandToolParameter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl CommandToolFile {
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Domain definition described by this unit
    pub fn definition(&self) -> ToolDefinition {
        self.parameters.iter().fold(
            ToolDefinition::new(self.name.trim(), self.description.trim()),
            |def, p| {
                def.with_parameter(
                    ToolParameter::new(p.name.as_str(), p.description.as_str(), p.required)
                        .with_type(p.param_type.as_str()),
                )
            },
        )
    }
}

/// Handler that runs a command template.
#[derive(Debug, Clone)]
pub struct CommandTool {
    definition: ToolDefinition,
    /// Command template with `{param_name}` placeholders
    command_template: String,
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl CommandTool {
    pub fn new(definition: ToolDefinition, command_template: impl Into<String>) -> Self {
        Self {
            definition,
            command_template: command_template.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            working_dir: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the working directory for command execution.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// Build the final command string by substituting parameters.
    ///
    /// `{param_name}` placeholders are replaced with shell-escaped argument
    /// values. Declared parameters without a value become empty strings;
    /// braces that do not form a placeholder are kept as-is.
    fn build_command(&self, call: &ToolCall) -> String {
        let mut result = String::with_capacity(self.command_template.len());
        let mut rest = self.command_template.as_str();

        while let Some(open) = rest.find('{') {
            result.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if is_placeholder_name(&after[..close]) => {
                    let name = &after[..close];
                    if let Some(value) = call.arguments.get(name) {
                        let value_str = match value {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        result.push_str(&shell_escape(&value_str));
                    }
                    rest = &after[close + 1..];
                }
                _ => {
                    result.push('{');
                    rest = after;
                }
            }
        }
        result.push_str(rest);
        result
    }

    async fn execute_command(&self, command_str: &str) -> ToolResult {
        let tool_name = self.definition.name.as_str();
        let start = Instant::now();

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command_str]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command_str]);
            c
        };

        if let Some(dir) = &self.working_dir
            && dir.is_dir()
        {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                return ToolResult::failure(
                    tool_name,
                    ToolError::execution_failed(format!("Failed to spawn command: {}", e)),
                );
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ToolResult::failure(
                    tool_name,
                    ToolError::execution_failed(format!("Failed to execute command: {}", e)),
                );
            }
            Err(_) => {
                return ToolResult::failure(
                    tool_name,
                    ToolError::timeout(format!(
                        "{} did not finish within {} seconds",
                        tool_name,
                        self.timeout.as_secs()
                    )),
                );
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut result_text = String::new();
        if !stdout.is_empty() {
            result_text.push_str(&stdout);
        }
        if !stderr.is_empty() {
            if !result_text.is_empty() {
                result_text.push_str("\n--- stderr ---\n");
            }
            result_text.push_str(&stderr);
        }
        truncate_output(&mut result_text);

        if result_text.is_empty() {
            result_text = if output.status.success() {
                "Command completed successfully (no output)".to_string()
            } else {
                format!("Command failed with exit code: {:?}", output.status.code())
            };
        }

        let metadata = ToolResultMetadata {
            duration_ms: Some(duration_ms),
            bytes: Some(result_text.len()),
            exit_code: output.status.code(),
        };

        if output.status.success() {
            ToolResult::success(tool_name, result_text).with_metadata(metadata)
        } else {
            ToolResult::failure(tool_name, ToolError::execution_failed(result_text))
                .with_metadata(metadata)
        }
    }
}

#[async_trait]
impl ToolHandler for CommandTool {
    async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let command_str = self.build_command(call);
        tracing::debug!(tool = %self.definition.name, command = %command_str, "Running command tool");
        self.execute_command(&command_str).await
    }
}

/// Loads `*.toml` command tool units.
#[derive(Debug, Clone, Default)]
pub struct CommandToolLoader {
    working_dir: Option<PathBuf>,
}

impl CommandToolLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Working directory for every command this loader produces
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Parse and validate a unit without touching the filesystem.
    pub fn load_str(&self, path: &Path, content: &str) -> Result<RegisteredTool, ToolLoadError> {
        let file = CommandToolFile::parse(content)
            .map_err(|e| ToolLoadError::invalid(path, e.message().trim().to_string()))?;
        let definition = file.definition();
        let name = definition.name.clone();

        definition
            .validate()
            .map_err(|e| ToolLoadError::invalid_tool(path, &name, e.to_string()))?;

        if file.command.trim().is_empty() {
            return Err(ToolLoadError::invalid_tool(path, &name, "command is empty"));
        }
        for placeholder in placeholders(&file.command) {
            if definition.parameter(placeholder).is_none() {
                return Err(ToolLoadError::invalid_tool(
                    path,
                    &name,
                    format!("command uses undeclared parameter '{{{}}}'", placeholder),
                ));
            }
        }

        let timeout = match file.timeout_secs {
            Some(0) => {
                return Err(ToolLoadError::invalid_tool(
                    path,
                    &name,
                    "timeout_secs must be greater than zero",
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let mut tool = CommandTool::new(definition.clone(), file.command).with_timeout(timeout);
        if let Some(dir) = &self.working_dir {
            tool = tool.with_working_dir(dir);
        }

        Ok(RegisteredTool::new(definition, Arc::new(tool)).with_source(path))
    }
}

impl ToolUnitLoader for CommandToolLoader {
    fn name(&self) -> &str {
        "command"
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "toml")
    }

    fn load(&self, path: &Path) -> Result<RegisteredTool, ToolLoadError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ToolLoadError::invalid(path, format!("cannot read unit: {}", e)))?;
        self.load_str(path, &content)
    }
}

fn is_placeholder_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Placeholder names in a template, in order of appearance
fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                found.push(&after[..close]);
                rest = &after[close + 1..];
            }
            _ => rest = after,
        }
    }
    found
}

fn truncate_output(text: &mut String) {
    if text.len() <= MAX_OUTPUT_SIZE {
        return;
    }
    let mut cut = MAX_OUTPUT_SIZE;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str("\n... (output truncated)");
}

/// Escape a string for safe shell substitution.
///
/// Uses OS-appropriate escaping:
/// - **Unix**: Single-quote wrapping (`hello 'world'` → `'hello '\''world'\'''`)
/// - **Windows**: Double-quote wrapping with `"` → `\"`, `%` → `%%`, `!` → `^!`
fn shell_escape(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '/')
    {
        return s.to_string();
    }

    if cfg!(target_os = "windows") {
        shell_escape_windows(s)
    } else {
        shell_escape_unix(s)
    }
}

fn shell_escape_unix(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 4);
    escaped.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}

fn shell_escape_windows(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 4);
    escaped.push('"');
    for ch in s.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '%' => escaped.push_str("%%"),
            '!' => escaped.push_str("^!"),
            _ => escaped.push(ch),
        }
    }
    escaped.push('"');
    escaped
}
