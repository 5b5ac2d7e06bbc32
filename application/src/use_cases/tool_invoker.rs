//! Tool invocation bound to one turn's snapshot.

use crate::ports::shell_events::{ShellEvent, ShellEventSink};
use crate::use_cases::tool_helpers::{panic_message, tool_args_preview};
use agentsh_domain::{
    DefaultToolValidator, ToolCall, ToolDefinition, ToolError, ToolHandler, ToolInvocation,
    ToolResult, ToolSnapshot, ToolValidator,
};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Routes a runtime's tool calls to the handlers of a fixed snapshot.
///
/// Created once per turn. Reloads that happen while the turn runs are not
/// visible here: a tool removed mid-turn keeps working until the turn ends,
/// and a tool added mid-turn is unknown until the next one.
///
/// Every call yields a [`ToolResult`]. Unknown tools, invalid arguments,
/// handler failures and handler panics all come back as failed results.
pub struct ToolInvoker {
    snapshot: Arc<ToolSnapshot>,
    events: Arc<dyn ShellEventSink>,
    validator: DefaultToolValidator,
    invocations: Mutex<Vec<ToolInvocation>>,
}

impl ToolInvoker {
    pub fn new(snapshot: Arc<ToolSnapshot>, events: Arc<dyn ShellEventSink>) -> Self {
        Self {
            snapshot,
            events,
            validator: DefaultToolValidator,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> &ToolSnapshot {
        &self.snapshot
    }

    /// Definitions offered to the runtime, sorted by name
    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        self.snapshot.definitions().collect()
    }

    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let started = Instant::now();
        self.events.emit(ShellEvent::ToolStarted {
            call_id: call.id.clone(),
            tool_name: call.tool_name.clone(),
            preview: tool_args_preview(call),
        });

        let result = match self.snapshot.get(&call.tool_name) {
            None => {
                debug!(tool = %call.tool_name, "Call to unknown tool");
                ToolResult::failure(&call.tool_name, ToolError::not_found(&call.tool_name))
            }
            Some(tool) => match self.validator.validate(call, &tool.definition) {
                Err(message) => {
                    ToolResult::failure(&call.tool_name, ToolError::invalid_argument(message))
                }
                Ok(()) => run_contained(Arc::clone(&tool.handler), call.clone()).await,
            },
        };

        let elapsed = started.elapsed();
        let duration_ms = elapsed.as_millis() as u64;
        let result = if result.metadata.duration_ms.is_none() {
            result.with_duration(duration_ms)
        } else {
            result
        };

        self.events.emit(ShellEvent::ToolFinished {
            call_id: call.id.clone(),
            tool_name: call.tool_name.clone(),
            success: result.is_success(),
            duration: elapsed,
            error: result.error().map(|e| e.to_string()),
        });

        self.lock_invocations()
            .push(ToolInvocation::new(call, result.clone(), duration_ms));
        result
    }

    /// Completed invocations so far, in completion order
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.lock_invocations().clone()
    }

    pub fn take_invocations(&self) -> Vec<ToolInvocation> {
        std::mem::take(&mut *self.lock_invocations())
    }

    fn lock_invocations(&self) -> std::sync::MutexGuard<'_, Vec<ToolInvocation>> {
        self.invocations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Aborts the handler task if the invoking future is dropped.
struct AbortOnDrop(JoinHandle<ToolResult>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run a handler in its own task so a panic cannot take the turn down.
async fn run_contained(handler: Arc<dyn ToolHandler>, call: ToolCall) -> ToolResult {
    let tool_name = call.tool_name.clone();
    let mut task = AbortOnDrop(tokio::spawn(async move { handler.invoke(&call).await }));

    match (&mut task.0).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let message = panic_message(e.into_panic().as_ref());
            warn!(tool = %tool_name, "Tool handler panicked: {}", message);
            ToolResult::failure(
                &tool_name,
                ToolError::execution_failed(format!("tool panicked: {}", message)),
            )
        }
        Err(e) => ToolResult::failure(
            &tool_name,
            ToolError::execution_failed(format!("tool task did not complete: {}", e)),
        ),
    }
}
