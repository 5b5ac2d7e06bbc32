//! Shared helpers for tool use cases.

use agentsh_domain::ToolCall;
use std::any::Any;

/// Extract a short preview string from tool call arguments.
///
/// Looks for well-known keys (`path`, `command`, `query`, `url`, `text`)
/// first, then falls back to the first string value in name order.
pub(crate) fn tool_args_preview(call: &ToolCall) -> String {
    let keys = ["path", "command", "query", "url", "text"];
    for key in &keys {
        if let Some(serde_json::Value::String(s)) = call.arguments.get(*key) {
            return truncate_preview(s, 50);
        }
    }
    let mut names: Vec<&String> = call.arguments.keys().collect();
    names.sort();
    for name in names {
        if let Some(s) = call.arguments.get(name).and_then(|v| v.as_str()) {
            return truncate_preview(s, 50);
        }
    }
    String::new()
}

fn truncate_preview(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
