//! Tool loading for the agent shell
//!
//! Tools are discovered in a directory of definition units. Each file is
//! handed to the first registered [`ToolUnitLoader`] that accepts it:
//!
//! - `command`: TOML units wrapping a shell command template ([`CommandToolLoader`])
//!
//! The [`ToolRegistry`] publishes the loaded set as immutable snapshots.

mod command_tool;
mod loader;
mod registry;
mod schema;

pub use command_tool::{CommandTool, CommandToolFile, CommandToolLoader, CommandToolParameter};
pub use loader::ToolUnitLoader;
pub use registry::{ChangeOutcome, LoadReport, ToolRegistry};
pub use schema::JsonSchemaToolConverter;

use std::path::Path;

/// Hidden files and editor temporaries are never tool units.
pub fn is_ignored(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    name.starts_with('.')
        || name.ends_with('~')
        || name.ends_with(".swp")
        || name.ends_with(".swx")
        || name.ends_with(".tmp")
}
