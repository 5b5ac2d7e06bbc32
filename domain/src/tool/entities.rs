//! Tool domain entities

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Parameter types a tool schema may declare.
pub const KNOWN_PARAM_TYPES: &[&str] = &["string", "path", "number", "integer", "boolean"];

/// Definition of a tool that can be offered to the reasoning runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "echo_tool")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Ordered parameter specifications
    pub parameters: Vec<ToolParameter>,
}

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// Parameter type (one of [`KNOWN_PARAM_TYPES`])
    pub param_type: String,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ToolParameter> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// Check the structural invariants of the schema.
    ///
    /// Names must be non-empty identifiers (`[A-Za-z0-9_-]`), parameter
    /// names unique, and parameter types known.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !is_identifier(&self.name) {
            return Err(DomainError::InvalidToolDefinition(format!(
                "tool name '{}' must be non-empty and use only letters, digits, '_' or '-'",
                self.name
            )));
        }
        if self.description.trim().is_empty() {
            return Err(DomainError::InvalidToolDefinition(format!(
                "tool '{}' has an empty description",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !is_identifier(&param.name) {
                return Err(DomainError::InvalidToolDefinition(format!(
                    "tool '{}' has an invalid parameter name '{}'",
                    self.name, param.name
                )));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(DomainError::InvalidToolDefinition(format!(
                    "tool '{}' declares parameter '{}' twice",
                    self.name, param.name
                )));
            }
            if !KNOWN_PARAM_TYPES.contains(&param.param_type.as_str()) {
                return Err(DomainError::InvalidToolDefinition(format!(
                    "parameter '{}' of tool '{}' has unknown type '{}'",
                    param.name, self.name, param.param_type
                )));
            }
        }
        Ok(())
    }
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: "string".to_string(),
        }
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A call to a tool with arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Runtime-assigned call identifier (e.g. an OpenAI `tool_call_id`)
    #[serde(default)]
    pub id: String,
    /// Name of the tool to call
    pub tool_name: String,
    /// Arguments passed to the tool
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            tool_name: tool_name.into(),
            arguments: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Replace the arguments with the members of a JSON object.
    ///
    /// Non-object values leave the call without arguments.
    pub fn with_json_arguments(mut self, value: serde_json::Value) -> Self {
        self.arguments = match value {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string argument or return an error message
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }
}
