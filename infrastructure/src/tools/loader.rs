//! Tool unit loader abstraction

use agentsh_domain::{RegisteredTool, ToolLoadError};
use std::path::Path;

/// Turns one file of the tools directory into a [`RegisteredTool`].
///
/// Loaders are registered explicitly on the
/// [`ToolRegistry`](super::registry::ToolRegistry); the first loader whose
/// [`accepts`](Self::accepts) returns `true` for a path handles it.
/// Files no loader accepts are ignored.
pub trait ToolUnitLoader: Send + Sync {
    /// Loader identifier for logs
    fn name(&self) -> &str;

    fn accepts(&self, path: &Path) -> bool;

    /// Parse and validate one unit. May panic; the registry contains it.
    fn load(&self, path: &Path) -> Result<RegisteredTool, ToolLoadError>;
}
