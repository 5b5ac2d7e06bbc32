//! Tool handler abstraction

use super::entities::{ToolCall, ToolDefinition};
use super::value_objects::ToolResult;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// The capability a loaded tool satisfies.
///
/// Handlers receive calls whose arguments have already been validated
/// against the tool's schema. Failures are reported through the returned
/// [`ToolResult`], never by panicking (a panic is still contained by the
/// caller and turned into a failed result).
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, call: &ToolCall) -> ToolResult;
}

/// A tool as published in a [`ToolSnapshot`](super::snapshot::ToolSnapshot).
#[derive(Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub handler: Arc<dyn ToolHandler>,
    /// File the tool was loaded from, if any
    pub source: Option<PathBuf>,
}

impl RegisteredTool {
    pub fn new(definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            definition,
            handler,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("definition", &self.definition)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
