//! Session record entities

use super::key::SessionKey;
use crate::tool::entities::ToolCall;
use crate::tool::value_objects::ToolResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Agent,
    ToolResult,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Agent => "agent",
            TurnRole::ToolResult => "tool_result",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a session.
///
/// `content` is an opaque JSON payload. User and agent turns store
/// `{"text": ...}`; tool-result turns store a serialized [`ToolInvocation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: Value,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: Value) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text_payload(text.into()))
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Agent, text_payload(text.into()))
    }

    pub fn tool_result(invocation: &ToolInvocation) -> Self {
        let content = serde_json::to_value(invocation).unwrap_or(Value::Null);
        Self::new(TurnRole::ToolResult, content)
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Text of a user or agent turn
    pub fn text(&self) -> Option<&str> {
        self.content.get("text").and_then(Value::as_str)
    }

    /// Decode the invocation stored in a tool-result turn
    pub fn invocation(&self) -> Option<ToolInvocation> {
        if self.role != TurnRole::ToolResult {
            return None;
        }
        serde_json::from_value(self.content.clone()).ok()
    }
}

fn text_payload(text: String) -> Value {
    serde_json::json!({ "text": text })
}

/// A completed tool call, as stored in a tool-result turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: HashMap<String, Value>,
    pub result: ToolResult,
    pub duration_ms: u64,
}

impl ToolInvocation {
    pub fn new(call: &ToolCall, result: ToolResult, duration_ms: u64) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.tool_name.clone(),
            arguments: call.arguments.clone(),
            result,
            duration_ms,
        }
    }
}

/// The persisted conversation for one [`SessionKey`].
///
/// Turns are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    key: SessionKey,
    #[serde(default)]
    turns: Vec<Turn>,
}

impl SessionRecord {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            turns: Vec::new(),
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn extend(&mut self, turns: impl IntoIterator<Item = Turn>) {
        self.turns.extend(turns);
    }

    /// Number of completed user exchanges
    pub fn exchange_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.role == TurnRole::User)
            .count()
    }
}
