//! Shell event port
//!
//! Callbacks for everything the user should see while a turn runs and while
//! the tool directory changes underneath the shell. Implementations live in
//! the presentation layer.

use agentsh_domain::SessionKey;
use std::time::Duration;

/// Severity of a [`ShellEvent::Notice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    /// A request was accepted and a tool snapshot captured
    TurnStarted {
        key: SessionKey,
        generation: u64,
        tool_count: usize,
    },
    ToolStarted {
        call_id: String,
        tool_name: String,
        /// Short rendering of the most telling argument
        preview: String,
    },
    ToolFinished {
        call_id: String,
        tool_name: String,
        success: bool,
        duration: Duration,
        error: Option<String>,
    },
    /// A piece of reply text as the runtime streams it
    ResponseDelta { text: String },
    /// Final text of a turn; `streamed` when it already went out as deltas
    Response { text: String, streamed: bool },
    Notice { level: NoticeLevel, message: String },
    /// The registry published a new snapshot
    ToolsReloaded {
        generation: u64,
        tool_count: usize,
        change: String,
        error: Option<String>,
    },
}

impl ShellEvent {
    pub fn warning(message: impl Into<String>) -> Self {
        ShellEvent::Notice {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
}

/// Receiver of [`ShellEvent`]s.
///
/// `emit` is synchronous and infallible; it may be called from the watcher
/// task and from tool tasks concurrently.
pub trait ShellEventSink: Send + Sync {
    fn emit(&self, event: ShellEvent);
}

/// No-op sink for tests and quiet mode
pub struct NoEvents;

impl ShellEventSink for NoEvents {
    fn emit(&self, _event: ShellEvent) {}
}
