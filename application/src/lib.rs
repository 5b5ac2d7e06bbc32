//! Application layer for agentsh
//!
//! This crate contains the agent shell use case and the port definitions it
//! is wired through. It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use ports::{
    reasoning_runtime::{ReasoningRuntime, RuntimeError, RuntimeReply, RuntimeRequest},
    session_store::{SessionStore, SessionStoreError},
    shell_events::{NoEvents, NoticeLevel, ShellEvent, ShellEventSink},
    tool_source::{FixedToolSource, ToolSource},
};
pub use use_cases::agent_shell::{AgentShell, SessionSummary, ShellError, TurnOutcome};
pub use use_cases::tool_invoker::ToolInvoker;
