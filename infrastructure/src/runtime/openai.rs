//! OpenAI-compatible chat-completions runtime.
//!
//! Works with any endpoint that speaks `/chat/completions` with function
//! calling: OpenAI itself, OpenRouter and Ollama's `/v1` compatibility layer.
//! With streaming on, text deltas are forwarded as
//! [`ShellEvent::ResponseDelta`] and tool-call fragments are stitched back
//! together by index.

use super::http::{ChatSettings, SseDecoder, build_client, map_transport_error};
use crate::tools::JsonSchemaToolConverter;
use agentsh_application::{
    ReasoningRuntime, RuntimeError, RuntimeReply, RuntimeRequest, ShellEvent, ShellEventSink,
    ToolInvoker,
};
use agentsh_domain::{ToolCall, ToolError, ToolResult, Turn, TurnRole};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Runtime backed by an OpenAI-compatible HTTP endpoint
pub struct OpenAiRuntime {
    client: Client,
    settings: ChatSettings,
    converter: JsonSchemaToolConverter,
}

impl OpenAiRuntime {
    pub fn new(settings: ChatSettings) -> Result<Self, RuntimeError> {
        let client = build_client(&settings)?;
        Ok(Self::with_client(settings, client))
    }

    pub(crate) fn with_client(settings: ChatSettings, client: Client) -> Self {
        Self {
            client,
            settings,
            converter: JsonSchemaToolConverter,
        }
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
        events: &dyn ShellEventSink,
    ) -> Result<ChatMessage, RuntimeError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages,
            tools,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stream: self.settings.stream,
        };

        let mut builder = self
            .client
            .post(self.settings.endpoint("chat/completions"))
            .json(&body);
        if let Some(key) = &self.settings.api_key {
            builder = builder.bearer_auth(key);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RuntimeError::RequestFailed(format!(
                "{} returned {}: {}",
                self.settings.provider,
                status,
                error_body.trim()
            )));
        }

        let message = if self.settings.stream {
            read_stream(response, events).await?
        } else {
            let chat: ChatResponse = response
                .json()
                .await
                .map_err(|e| RuntimeError::InvalidResponse(e.to_string()))?;
            chat.choices
                .into_iter()
                .next()
                .map(|choice| choice.message)
                .ok_or_else(|| {
                    RuntimeError::InvalidResponse("response has no choices".to_string())
                })?
        };

        debug!(
            provider = %self.settings.provider,
            model = %self.settings.model,
            streamed = self.settings.stream,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Chat completion received"
        );
        Ok(message)
    }
}

#[async_trait]
impl ReasoningRuntime for OpenAiRuntime {
    fn name(&self) -> &str {
        &self.settings.provider
    }

    fn model(&self) -> Option<&str> {
        Some(&self.settings.model)
    }

    async fn respond(&self, request: RuntimeRequest<'_>) -> Result<RuntimeReply, RuntimeError> {
        let mut messages = build_messages(request.system_prompt, request.history, request.input);
        let tools = self.converter.openai_tools(request.tools.definitions());
        let max_rounds = self.settings.max_tool_rounds;

        for round in 0..=max_rounds {
            let reply = self.complete(&messages, &tools, request.events).await?;

            if reply.tool_calls.is_empty() {
                let text = reply.content.unwrap_or_default();
                return Ok(if self.settings.stream {
                    RuntimeReply::streamed(text)
                } else {
                    RuntimeReply::new(text)
                });
            }
            if round == max_rounds {
                warn!(rounds = max_rounds, "Tool loop limit reached");
                break;
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);
            for call in calls {
                let content = run_tool_call(request.tools, &call).await;
                messages.push(ChatMessage::tool(call.id, content));
            }
        }

        Err(RuntimeError::ToolRoundsExceeded(max_rounds))
    }
}

async fn run_tool_call(tools: &ToolInvoker, call: &WireToolCall) -> String {
    let arguments = if call.function.arguments.trim().is_empty() {
        serde_json::Value::Object(Default::default())
    } else {
        match serde_json::from_str(&call.function.arguments) {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = %call.function.name, "Unparseable tool arguments: {}", e);
                return ToolResult::failure(
                    &call.function.name,
                    ToolError::invalid_argument(format!("arguments are not valid JSON: {}", e)),
                )
                .content_for_runtime();
            }
        }
    };

    let tool_call = ToolCall::new(&call.function.name)
        .with_id(&call.id)
        .with_json_arguments(arguments);
    tools.invoke(&tool_call).await.content_for_runtime()
}

/// Drain a `text/event-stream` completion into one assistant message.
async fn read_stream(
    response: reqwest::Response,
    events: &dyn ShellEventSink,
) -> Result<ChatMessage, RuntimeError> {
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::default();
    let mut message = StreamedMessage::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_transport_error)?;
        for data in decoder.push(&chunk)? {
            if data == "[DONE]" {
                return Ok(message.finish());
            }
            let parsed: StreamChunk = match serde_json::from_str(&data) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!("Skipping unparseable stream chunk: {}", e);
                    continue;
                }
            };
            if let Some(error) = parsed.error {
                return Err(RuntimeError::RequestFailed(error.message));
            }
            for choice in parsed.choices {
                message.apply(choice.delta, events);
            }
        }
    }

    Ok(message.finish())
}

#[derive(Default)]
struct StreamedMessage {
    content: String,
    tool_calls: Vec<WireToolCall>,
}

impl StreamedMessage {
    fn apply(&mut self, delta: Delta, events: &dyn ShellEventSink) {
        if let Some(text) = delta.content
            && !text.is_empty()
        {
            self.content.push_str(&text);
            events.emit(ShellEvent::ResponseDelta { text });
        }

        for fragment in delta.tool_calls {
            while self.tool_calls.len() <= fragment.index {
                self.tool_calls.push(WireToolCall {
                    id: String::new(),
                    kind: function_kind(),
                    function: WireFunction {
                        name: String::new(),
                        arguments: String::new(),
                    },
                });
            }
            let call = &mut self.tool_calls[fragment.index];
            if let Some(id) = fragment.id {
                call.id = id;
            }
            if let Some(function) = fragment.function {
                if let Some(name) = function.name {
                    call.function.name.push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    call.function.arguments.push_str(&arguments);
                }
            }
        }
    }

    fn finish(self) -> ChatMessage {
        let tool_calls: Vec<WireToolCall> = self
            .tool_calls
            .into_iter()
            .filter(|call| !call.function.name.is_empty())
            .collect();
        ChatMessage {
            role: "assistant".to_string(),
            content: (!self.content.is_empty() || tool_calls.is_empty()).then_some(self.content),
            tool_calls,
            tool_call_id: None,
        }
    }
}

/// System prompt, prior user/agent exchanges, then the new input.
///
/// Persisted tool-result turns are not replayed: their tool-call ids belong
/// to earlier requests and the final agent text already reflects them.
fn build_messages(system_prompt: &str, history: &[Turn], input: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if !system_prompt.trim().is_empty() {
        messages.push(ChatMessage::text("system", system_prompt));
    }
    for turn in history {
        let role = match turn.role {
            TurnRole::User => "user",
            TurnRole::Agent => "assistant",
            TurnRole::ToolResult => continue,
        };
        if let Some(text) = turn.text() {
            messages.push(ChatMessage::text(role, text));
        }
    }
    messages.push(ChatMessage::text("user", input));
    messages
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [serde_json::Value],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

fn no_tools(tools: &&[serde_json::Value]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    fn tool(call_id: String, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct StreamError {
    message: String,
}
