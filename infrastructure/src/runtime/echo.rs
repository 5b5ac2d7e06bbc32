//! Offline runtime that needs no model.
//!
//! Plain input is echoed back together with the current tool set. Input of
//! the form `!tool <name> [json-args]` calls that tool directly, which makes
//! hot reload observable from the shell.

use agentsh_application::{ReasoningRuntime, RuntimeError, RuntimeReply, RuntimeRequest};
use agentsh_domain::ToolCall;
use async_trait::async_trait;

const TOOL_COMMAND: &str = "!tool";

#[derive(Debug, Default, Clone, Copy)]
pub struct EchoRuntime;

impl EchoRuntime {
    pub fn new() -> Self {
        Self
    }
}

/// Split `!tool <name> [json]` into its parts.
fn parse_tool_command(input: &str) -> Option<(&str, &str)> {
    let rest = input.trim().strip_prefix(TOOL_COMMAND)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let (name, args) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest, ""));
    Some((name, args.trim()))
}

#[async_trait]
impl ReasoningRuntime for EchoRuntime {
    fn name(&self) -> &str {
        "echo"
    }

    async fn respond(&self, request: RuntimeRequest<'_>) -> Result<RuntimeReply, RuntimeError> {
        if let Some((name, args)) = parse_tool_command(request.input) {
            if name.is_empty() {
                return Ok(RuntimeReply::new("Usage: !tool <name> [json-args]"));
            }

            let arguments = if args.is_empty() {
                serde_json::Value::Object(Default::default())
            } else {
                match serde_json::from_str(args) {
                    Ok(value) => value,
                    Err(e) => {
                        return Ok(RuntimeReply::new(format!(
                            "Invalid tool arguments for '{}': {}",
                            name, e
                        )));
                    }
                }
            };

            let call = ToolCall::new(name).with_json_arguments(arguments);
            let result = request.tools.invoke(&call).await;
            return Ok(RuntimeReply::new(format!(
                "[{}] {}",
                name,
                result.content_for_runtime().trim_end()
            )));
        }

        let names: Vec<&str> = request.tools.snapshot().names();
        let tool_list = if names.is_empty() {
            "(none)".to_string()
        } else {
            names.join(", ")
        };

        Ok(RuntimeReply::new(format!(
            "Echo: {}\nTools ({}): {}\nHistory: {} turns",
            request.input.trim(),
            names.len(),
            tool_list,
            request.history.len()
        )))
    }
}
