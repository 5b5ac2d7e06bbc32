//! Tool source port

use agentsh_domain::{ToolLoadError, ToolSnapshot};
use std::sync::Arc;

/// Provider of the current tool set.
///
/// The registry in the infrastructure layer implements this; the shell
/// captures one snapshot per turn and never looks again until the next.
pub trait ToolSource: Send + Sync {
    fn snapshot(&self) -> Arc<ToolSnapshot>;

    /// Units that currently fail to load
    fn load_errors(&self) -> Vec<ToolLoadError> {
        Vec::new()
    }
}

/// A tool set that never changes.
pub struct FixedToolSource(Arc<ToolSnapshot>);

impl FixedToolSource {
    pub fn new(snapshot: ToolSnapshot) -> Self {
        Self(Arc::new(snapshot))
    }
}

impl ToolSource for FixedToolSource {
    fn snapshot(&self) -> Arc<ToolSnapshot> {
        Arc::clone(&self.0)
    }
}
