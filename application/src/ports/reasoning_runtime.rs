//! Reasoning runtime port
//!
//! Defines the interface to the external model/agent runtime that turns a
//! request into a reply, calling tools along the way.

use crate::ports::shell_events::ShellEventSink;
use crate::use_cases::tool_invoker::ToolInvoker;
use agentsh_domain::Turn;
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a reasoning runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Tool loop exceeded {0} rounds")]
    ToolRoundsExceeded(usize),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// Everything a runtime needs for one turn.
///
/// `tools` is bound to the snapshot captured when the turn began; every
/// tool call made through it sees that same tool set.
pub struct RuntimeRequest<'a> {
    pub system_prompt: &'a str,
    /// Prior turns of the current session, oldest first
    pub history: &'a [Turn],
    pub input: &'a str,
    pub tools: &'a ToolInvoker,
    /// Receives [`ShellEvent::ResponseDelta`](crate::ports::shell_events::ShellEvent::ResponseDelta)s
    /// from runtimes that stream
    pub events: &'a dyn ShellEventSink,
}

/// Final answer of a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeReply {
    pub text: String,
    /// The text was already emitted as deltas while it arrived
    pub streamed: bool,
}

impl RuntimeReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            streamed: false,
        }
    }

    pub fn streamed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            streamed: true,
        }
    }
}

/// The external reasoning runtime.
///
/// Implementations (adapters) live in the infrastructure layer. How the
/// runtime loops over model calls is its own business; the shell only sees
/// the final reply, any streamed deltas and the tool calls routed through
/// [`ToolInvoker`].
#[async_trait]
pub trait ReasoningRuntime: Send + Sync {
    /// Short provider name for banners and logs (e.g. "openai", "echo")
    fn name(&self) -> &str;

    /// Model identifier, if the runtime has one
    fn model(&self) -> Option<&str> {
        None
    }

    async fn respond(&self, request: RuntimeRequest<'_>) -> Result<RuntimeReply, RuntimeError>;
}
