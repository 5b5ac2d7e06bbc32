//! Tool domain traits
//!
//! Contains pure domain logic for validating a call against a tool's schema.
//! Invocation itself goes through [`ToolHandler`](super::handler::ToolHandler).

use super::entities::{ToolCall, ToolDefinition};

/// Validator for tool calls
///
/// This is a pure domain trait that validates tool calls
/// against their definitions without any I/O operations.
pub trait ToolValidator {
    /// Validate a tool call against its definition
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), String>;
}

/// Default implementation of ToolValidator
///
/// Checks required parameters, rejects unknown ones, and checks that
/// `number`/`integer`/`boolean` parameters carry values of that JSON type.
/// `string` and `path` parameters accept any scalar, since runtimes often
/// send numbers for free-text fields.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), String> {
        for param in definition.required_parameters() {
            if !call.arguments.contains_key(&param.name) {
                return Err(format!(
                    "Missing required parameter '{}' for tool '{}'",
                    param.name, definition.name
                ));
            }
        }

        for (arg_name, value) in &call.arguments {
            let Some(param) = definition.parameter(arg_name) else {
                return Err(format!(
                    "Unknown parameter '{}' for tool '{}'",
                    arg_name, definition.name
                ));
            };

            let type_ok = match param.param_type.as_str() {
                "number" => value.is_number(),
                "integer" => value.is_i64() || value.is_u64(),
                "boolean" => value.is_boolean(),
                _ => !value.is_array() && !value.is_object(),
            };
            if !type_ok {
                return Err(format!(
                    "Parameter '{}' of tool '{}' expects {}, got {}",
                    arg_name, definition.name, param.param_type, value
                ));
            }
        }

        Ok(())
    }
}
