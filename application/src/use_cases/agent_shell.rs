//! Agent shell use case.
//!
//! One request in, one reply out. For each request the shell:
//!
//! 1. captures the current [`ToolSnapshot`](agentsh_domain::ToolSnapshot)
//! 2. loads the session record for its key
//! 3. hands both to the [`ReasoningRuntime`] through a [`ToolInvoker`]
//! 4. commits `[user, tool results…, agent]` with a single `append_all`
//!
//! Nothing is committed when the runtime fails or the turn is dropped.

use crate::ports::reasoning_runtime::{ReasoningRuntime, RuntimeError, RuntimeRequest};
use crate::ports::session_store::{SessionStore, SessionStoreError};
use crate::ports::shell_events::{NoEvents, ShellEvent, ShellEventSink};
use crate::ports::tool_source::ToolSource;
use crate::use_cases::tool_invoker::ToolInvoker;
use agentsh_domain::{SessionKey, SessionRecord, ToolInvocation, Turn};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that fail a single turn. The shell stays usable afterwards.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Empty request")]
    EmptyInput,

    #[error(transparent)]
    Session(#[from] SessionStoreError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl ShellError {
    /// Whether the session record for this key is unusable
    pub fn is_session_corruption(&self) -> bool {
        matches!(self, ShellError::Session(e) if e.is_corruption())
    }
}

/// Result of a completed turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub text: String,
    pub invocations: Vec<ToolInvocation>,
    /// Generation of the tool snapshot the turn ran against
    pub generation: u64,
}

/// Summary of the current session for `/session`
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub key: SessionKey,
    pub turns: usize,
    pub exchanges: usize,
}

pub struct AgentShell {
    runtime: Arc<dyn ReasoningRuntime>,
    tools: Arc<dyn ToolSource>,
    store: Arc<dyn SessionStore>,
    events: Arc<dyn ShellEventSink>,
    key: SessionKey,
    system_prompt: String,
}

impl AgentShell {
    pub fn new(
        runtime: Arc<dyn ReasoningRuntime>,
        tools: Arc<dyn ToolSource>,
        store: Arc<dyn SessionStore>,
        key: SessionKey,
    ) -> Self {
        Self {
            runtime,
            tools,
            store,
            events: Arc::new(NoEvents),
            key,
            system_prompt: String::new(),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn ShellEventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    pub fn runtime_model(&self) -> Option<&str> {
        self.runtime.model()
    }

    pub fn tools(&self) -> &Arc<dyn ToolSource> {
        &self.tools
    }

    pub fn events(&self) -> &Arc<dyn ShellEventSink> {
        &self.events
    }

    /// Load the session record, surfacing corruption right away.
    ///
    /// Called once at startup so a damaged record is reported before the
    /// first request rather than in the middle of it.
    pub async fn resume(&self) -> Result<SessionSummary, ShellError> {
        let record = self.store.load(&self.key).await?;
        if !record.is_empty() {
            info!(key = %self.key, turns = record.len(), "Resuming session");
        }
        Ok(summarize(&record))
    }

    pub async fn session_summary(&self) -> Result<SessionSummary, ShellError> {
        let record = self.store.load(&self.key).await?;
        Ok(summarize(&record))
    }

    /// Move the current record aside and start over under the same key.
    pub async fn reset_session(&self) -> Result<bool, ShellError> {
        let moved = self.store.reset(&self.key).await?;
        if moved {
            warn!(key = %self.key, "Session record moved aside");
        }
        Ok(moved)
    }

    /// Run one request to completion.
    pub async fn handle(&self, input: &str) -> Result<TurnOutcome, ShellError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ShellError::EmptyInput);
        }

        let snapshot = self.tools.snapshot();
        let generation = snapshot.generation();
        let record = self.store.load(&self.key).await?;

        self.events.emit(ShellEvent::TurnStarted {
            key: self.key.clone(),
            generation,
            tool_count: snapshot.len(),
        });
        debug!(
            key = %self.key,
            generation,
            tools = snapshot.len(),
            history = record.len(),
            "Starting turn"
        );

        let user_turn = Turn::user(input);
        let invoker = ToolInvoker::new(snapshot, Arc::clone(&self.events));

        let reply = self
            .runtime
            .respond(RuntimeRequest {
                system_prompt: &self.system_prompt,
                history: record.turns(),
                input,
                tools: &invoker,
                events: self.events.as_ref(),
            })
            .await?;

        let invocations = invoker.take_invocations();
        let mut turns = Vec::with_capacity(invocations.len() + 2);
        turns.push(user_turn);
        turns.extend(invocations.iter().map(Turn::tool_result));
        turns.push(Turn::agent(&reply.text));

        self.store.append_all(&self.key, turns).await?;
        debug!(key = %self.key, tool_calls = invocations.len(), "Turn committed");

        self.events.emit(ShellEvent::Response {
            text: reply.text.clone(),
            streamed: reply.streamed,
        });

        Ok(TurnOutcome {
            text: reply.text,
            invocations,
            generation,
        })
    }
}

fn summarize(record: &SessionRecord) -> SessionSummary {
    SessionSummary {
        key: record.key().clone(),
        turns: record.len(),
        exchanges: record.exchange_count(),
    }
}
