//! Tool domain value objects: invocation results and errors
//!
//! Every tool invocation produces a [`ToolResult`]. Failures carry a
//! [`ToolError`] whose [`ToolErrorCode`] tells the reasoning runtime whether
//! it can fix the call (bad arguments, unknown tool) or not.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a tool invocation failure.
///
/// | Code | Runtime can fix it? | Description |
/// |------|------|-------------|
/// | `INVALID_ARGUMENT` | Yes | Missing/wrong parameters |
/// | `NOT_FOUND` | Yes | Unknown tool (or removed by a reload) |
/// | `EXECUTION_FAILED` | No | Handler failed (non-zero exit, I/O error, panic) |
/// | `TIMEOUT` | No | Handler exceeded its time limit |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorCode {
    InvalidArgument,
    NotFound,
    ExecutionFailed,
    Timeout,
}

impl ToolErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ToolErrorCode::NotFound => "NOT_FOUND",
            ToolErrorCode::ExecutionFailed => "EXECUTION_FAILED",
            ToolErrorCode::Timeout => "TIMEOUT",
        }
    }

    /// Whether the caller may retry with a corrected call
    pub fn is_correctable(&self) -> bool {
        matches!(self, ToolErrorCode::InvalidArgument | ToolErrorCode::NotFound)
    }
}

impl fmt::Display for ToolErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that occurred during tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: ToolErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl ToolError {
    pub fn new(code: ToolErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(tool_name: impl Into<String>) -> Self {
        Self::new(
            ToolErrorCode::NotFound,
            format!("Tool not found: {}", tool_name.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ToolErrorCode::InvalidArgument, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ToolErrorCode::ExecutionFailed, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            ToolErrorCode::Timeout,
            format!("Operation timed out: {}", operation.into()),
        )
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}

/// Result of a tool invocation, carrying output or error information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that was invoked
    pub tool_name: String,
    /// Whether the invocation was successful
    pub success: bool,
    /// Output content (for successful invocation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error information (for failed invocation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(default)]
    pub metadata: ToolResultMetadata,
}

/// Structured metadata about a tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    /// Duration of execution in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Number of output bytes returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    /// For command tools: exit code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: Some(output.into()),
            error: None,
            metadata: ToolResultMetadata::default(),
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error),
            metadata: ToolResultMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ToolResultMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    /// Text handed back to the reasoning runtime for this result.
    pub fn content_for_runtime(&self) -> String {
        match (&self.output, &self.error) {
            (Some(output), _) if self.success => output.clone(),
            (_, Some(error)) => format!("Error: {}", error),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::not_found("weather");
        assert_eq!(err.code, ToolErrorCode::NotFound);
        assert_eq!(err.to_string(), "[NOT_FOUND] Tool not found: weather");
    }

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ToolErrorCode::InvalidArgument).unwrap();
        assert_eq!(json, "\"INVALID_ARGUMENT\"");
        assert!(ToolErrorCode::InvalidArgument.is_correctable());
        assert!(!ToolErrorCode::Timeout.is_correctable());
    }

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("echo_tool", "hello").with_duration(12);

        assert!(result.is_success());
        assert_eq!(result.output(), Some("hello"));
        assert!(result.error().is_none());
        assert_eq!(result.metadata.duration_ms, Some(12));
        assert_eq!(result.content_for_runtime(), "hello");
    }

    #[test]
    fn test_tool_result_failure() {
        let result = ToolResult::failure("echo_tool", ToolError::timeout("echo_tool"));

        assert!(!result.is_success());
        assert!(result.output().is_none());
        assert_eq!(result.error().unwrap().code, ToolErrorCode::Timeout);
        assert!(result.content_for_runtime().starts_with("Error: [TIMEOUT]"));
    }
}
