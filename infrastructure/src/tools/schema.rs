//! JSON Schema tool converter.
//!
//! Produces the provider-neutral JSON Schema of a tool, and the OpenAI
//! `tools` entry wrapping it. The neutral form is what the Anthropic
//! Messages API takes as is.

use agentsh_domain::ToolDefinition;

/// Converter from [`ToolDefinition`] to JSON Schema.
///
/// Handles param_type → JSON Schema type mapping:
/// - `"string"`, `"path"` → `"string"`
/// - `"number"` → `"number"`
/// - `"integer"` → `"integer"`
/// - `"boolean"` → `"boolean"`
/// - anything else → `"string"`
pub struct JsonSchemaToolConverter;

impl JsonSchemaToolConverter {
    /// JSON Schema of the tool's input object
    pub fn input_schema(&self, tool: &ToolDefinition) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &tool.parameters {
            let schema_type = match param.param_type.as_str() {
                "string" | "path" => "string",
                "number" => "number",
                "integer" => "integer",
                "boolean" => "boolean",
                _ => "string",
            };

            let mut prop = serde_json::Map::new();
            prop.insert("type".to_string(), serde_json::json!(schema_type));
            if !param.description.is_empty() {
                prop.insert(
                    "description".to_string(),
                    serde_json::json!(param.description),
                );
            }
            properties.insert(param.name.clone(), serde_json::Value::Object(prop));

            if param.required {
                required.push(serde_json::json!(param.name));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Provider-neutral schema: name, description, input_schema
    pub fn tool_to_schema(&self, tool: &ToolDefinition) -> serde_json::Value {
        serde_json::json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": self.input_schema(tool),
        })
    }

    /// OpenAI chat-completions `tools` entry
    pub fn tool_to_openai_function(&self, tool: &ToolDefinition) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": self.input_schema(tool),
            }
        })
    }

    /// Convert all tools to OpenAI function entries (sorted by name).
    pub fn openai_tools<'a>(
        &self,
        tools: impl IntoIterator<Item = &'a ToolDefinition>,
    ) -> Vec<serde_json::Value> {
        let mut tools: Vec<&ToolDefinition> = tools.into_iter().collect();
        tools.sort_by_key(|t| &t.name);
        tools
            .into_iter()
            .map(|t| self.tool_to_openai_function(t))
            .collect()
    }

    /// Convert all tools to Anthropic Messages entries (sorted by name).
    pub fn anthropic_tools<'a>(
        &self,
        tools: impl IntoIterator<Item = &'a ToolDefinition>,
    ) -> Vec<serde_json::Value> {
        let mut tools: Vec<&ToolDefinition> = tools.into_iter().collect();
        tools.sort_by_key(|t| &t.name);
        tools.into_iter().map(|t| self.tool_to_schema(t)).collect()
    }
}
