use std::path::{Path, PathBuf};
use thiserror::Error;

/// A tool-definition unit that could not be loaded.
///
/// Load errors are isolated per unit: the rest of the directory still loads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolLoadError {
    #[error("{}: {reason}{}", path.display(), tool_name.as_ref().map(|n| format!(" (tool '{n}')")).unwrap_or_default())]
    Invalid {
        path: PathBuf,
        tool_name: Option<String>,
        reason: String,
    },

    #[error("{}: loader panicked: {message}", path.display())]
    Panicked { path: PathBuf, message: String },
}

impl ToolLoadError {
    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            tool_name: None,
            reason: reason.into(),
        }
    }

    pub fn invalid_tool(
        path: impl Into<PathBuf>,
        tool_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            path: path.into(),
            tool_name: Some(tool_name.into()),
            reason: reason.into(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Invalid { path, .. } | Self::Panicked { path, .. } => path,
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Self::Invalid { tool_name, .. } => tool_name.as_deref(),
            Self::Panicked { .. } => None,
        }
    }
}
