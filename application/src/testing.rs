//! In-memory fakes for the application ports.

use crate::ports::reasoning_runtime::{
    ReasoningRuntime, RuntimeError, RuntimeReply, RuntimeRequest,
};
use crate::ports::session_store::{SessionStore, SessionStoreError};
use crate::ports::shell_events::{ShellEvent, ShellEventSink};
use agentsh_domain::{SessionKey, SessionRecord, ToolCall, ToolHandler, ToolResult, Turn};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Runtime that makes a fixed list of tool calls, then replies.
pub(crate) struct ScriptedRuntime {
    calls: Vec<ToolCall>,
    outcome: Result<String, String>,
    delay: Option<Duration>,
    /// Emit the reply as these deltas instead of all at once
    deltas: Option<Vec<String>>,
    history_lens: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedRuntime {
    pub(crate) fn reply(text: &str) -> Self {
        Self {
            calls: Vec::new(),
            outcome: Ok(text.to_string()),
            delay: None,
            deltas: None,
            history_lens: Arc::default(),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            ..Self::reply("")
        }
    }

    pub(crate) fn with_call(mut self, call: ToolCall) -> Self {
        self.calls.push(call);
        self
    }

    /// Stream the reply as `pieces`, which join to the final text
    pub(crate) fn streaming(pieces: &[&str]) -> Self {
        Self {
            deltas: Some(pieces.iter().map(|p| p.to_string()).collect()),
            ..Self::reply(&pieces.concat())
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Length of the history seen by each `respond` call
    pub(crate) fn seen_history(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.history_lens)
    }
}

#[async_trait]
impl ReasoningRuntime for ScriptedRuntime {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn respond(&self, request: RuntimeRequest<'_>) -> Result<RuntimeReply, RuntimeError> {
        self.history_lens.lock().unwrap().push(request.history.len());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        for call in &self.calls {
            request.tools.invoke(call).await;
        }
        if let Some(deltas) = &self.deltas {
            for delta in deltas {
                request.events.emit(ShellEvent::ResponseDelta { text: delta.clone() });
            }
        }
        match &self.outcome {
            Ok(text) if self.deltas.is_some() => Ok(RuntimeReply::streamed(text.clone())),
            Ok(text) => Ok(RuntimeReply::new(text.clone())),
            Err(message) => Err(RuntimeError::RequestFailed(message.clone())),
        }
    }
}

#[derive(Default)]
pub(crate) struct MemorySessionStore {
    records: Mutex<HashMap<SessionKey, SessionRecord>>,
    corrupt: Mutex<HashSet<SessionKey>>,
    commits: AtomicUsize,
}

impl MemorySessionStore {
    pub(crate) fn corrupt(&self, key: &SessionKey) {
        self.corrupt.lock().unwrap().insert(key.clone());
    }

    pub(crate) fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn check(&self, key: &SessionKey) -> Result<(), SessionStoreError> {
        if self.corrupt.lock().unwrap().contains(key) {
            return Err(SessionStoreError::StorageCorruption {
                key: key.clone(),
                reason: "marked corrupt".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &SessionKey) -> Result<SessionRecord, SessionStoreError> {
        self.check(key)?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_else(|| SessionRecord::new(key.clone())))
    }

    async fn append_all(
        &self,
        key: &SessionKey,
        turns: Vec<Turn>,
    ) -> Result<(), SessionStoreError> {
        self.check(key)?;
        self.records
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_insert_with(|| SessionRecord::new(key.clone()))
            .extend(turns);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reset(&self, key: &SessionKey) -> Result<bool, SessionStoreError> {
        let was_corrupt = self.corrupt.lock().unwrap().remove(key);
        let had_record = self.records.lock().unwrap().remove(key).is_some();
        Ok(was_corrupt || had_record)
    }

    async fn list(&self) -> Result<Vec<SessionKey>, SessionStoreError> {
        let mut keys: Vec<SessionKey> = self.records.lock().unwrap().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<ShellEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<ShellEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ShellEventSink for RecordingSink {
    fn emit(&self, event: ShellEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Handlers with fixed behavior.
pub(crate) enum StaticTool {
    /// Returns the `text` argument
    Echo,
    Panic,
}

#[async_trait]
impl ToolHandler for StaticTool {
    async fn invoke(&self, call: &ToolCall) -> ToolResult {
        match self {
            StaticTool::Echo => {
                ToolResult::success(&call.tool_name, call.get_string("text").unwrap_or_default())
            }
            StaticTool::Panic => panic!("handler exploded"),
        }
    }
}
