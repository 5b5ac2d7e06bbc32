//! Anthropic Messages API runtime.
//!
//! Tools go out as `{name, description, input_schema}`; the model answers
//! with `tool_use` blocks and gets `tool_result` blocks back in a user
//! message, until it stops asking.

use super::http::{ChatSettings, SseDecoder, build_client, map_transport_error};
use crate::tools::JsonSchemaToolConverter;
use agentsh_application::{
    ReasoningRuntime, RuntimeError, RuntimeReply, RuntimeRequest, ShellEvent, ShellEventSink,
};
use agentsh_domain::{ToolCall, Turn, TurnRole};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// Messages API version sent with every request
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Runtime backed by the Anthropic Messages API
pub struct AnthropicRuntime {
    client: Client,
    settings: ChatSettings,
    converter: JsonSchemaToolConverter,
}

impl AnthropicRuntime {
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
        system: &str,
        messages: &[Message],
        tools: &[Value],
        events: &dyn ShellEventSink,
    ) -> Result<Vec<Block>, RuntimeError> {
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            system,
            messages,
            tools,
            temperature: self.settings.temperature,
            stream: self.settings.stream,
        };

        let mut builder = self
            .client
            .post(self.settings.endpoint("messages"))
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        if let Some(key) = &self.settings.api_key {
            builder = builder.header("x-api-key", key);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&error_body)
                .map(|body| body.error.message)
                .unwrap_or_else(|_| error_body.trim().to_string());
            return Err(RuntimeError::RequestFailed(format!(
                "{} returned {}: {}",
                self.settings.provider, status, message
            )));
        }

        let content = if self.settings.stream {
            read_stream(response, events).await?
        } else {
            let reply: MessagesResponse = response
                .json()
                .await
                .map_err(|e| RuntimeError::InvalidResponse(e.to_string()))?;
            debug!(stop_reason = ?reply.stop_reason, "Messages reply stop reason");
            reply.content
        };

        debug!(
            provider = %self.settings.provider,
            model = %self.settings.model,
            streamed = self.settings.stream,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Messages reply received"
        );
        Ok(content)
    }
}

#[async_trait]
impl ReasoningRuntime for AnthropicRuntime {
    fn name(&self) -> &str {
        &self.settings.provider
    }

    fn model(&self) -> Option<&str> {
        Some(&self.settings.model)
    }

    async fn respond(&self, request: RuntimeRequest<'_>) -> Result<RuntimeReply, RuntimeError> {
        let system = request.system_prompt.trim();
        let mut messages = build_messages(request.history, request.input);
        let tools = self.converter.anthropic_tools(request.tools.definitions());
        let max_rounds = self.settings.max_tool_rounds;

        for round in 0..=max_rounds {
            let content = self
                .complete(system, &messages, &tools, request.events)
                .await?;

            let uses: Vec<(String, String, Value)> = content
                .iter()
                .filter_map(|block| match block {
                    Block::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            if uses.is_empty() {
                let text = reply_text(&content);
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

            messages.push(Message {
                role: "assistant",
                content: content.into_iter().filter(Block::is_replayable).collect(),
            });

            let mut results = Vec::with_capacity(uses.len());
            for (id, name, input) in uses {
                let call = ToolCall::new(&name).with_id(&id).with_json_arguments(input);
                let result = request.tools.invoke(&call).await;
                results.push(Block::ToolResult {
                    tool_use_id: id,
                    content: result.content_for_runtime(),
                    is_error: !result.is_success(),
                });
            }
            messages.push(Message {
                role: "user",
                content: results,
            });
        }

        Err(RuntimeError::ToolRoundsExceeded(max_rounds))
    }
}

fn reply_text(content: &[Block]) -> String {
    content
        .iter()
        .filter_map(|block| match block {
            Block::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Prior user/agent exchanges, then the new input.
///
/// The API wants alternating roles, so consecutive turns of one role are
/// folded into a single message. Persisted tool-result turns are skipped.
fn build_messages(history: &[Turn], input: &str) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::with_capacity(history.len() + 1);
    let turns = history
        .iter()
        .filter_map(|turn| {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Agent => "assistant",
                TurnRole::ToolResult => return None,
            };
            turn.text().map(|text| (role, text))
        })
        .chain(std::iter::once(("user", input)));

    for (role, text) in turns {
        if text.is_empty() {
            continue;
        }
        let block = Block::Text {
            text: text.to_string(),
        };
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.push(block),
            _ => messages.push(Message {
                role,
                content: vec![block],
            }),
        }
    }
    messages
}

/// Drain a Messages event stream into its content blocks.
async fn read_stream(
    response: reqwest::Response,
    events: &dyn ShellEventSink,
) -> Result<Vec<Block>, RuntimeError> {
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::default();
    let mut content = StreamedContent::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_transport_error)?;
        for data in decoder.push(&chunk)? {
            let event: StreamEvent = match serde_json::from_str(&data) {
                Ok(event) => event,
                Err(e) => {
                    debug!("Skipping unparseable stream event: {}", e);
                    continue;
                }
            };
            match event {
                StreamEvent::ContentBlockStart {
                    index,
                    content_block,
                } => content.start(index, content_block),
                StreamEvent::ContentBlockDelta { index, delta } => {
                    content.apply(index, delta, events)
                }
                StreamEvent::MessageDelta { delta } => {
                    debug!(stop_reason = ?delta.stop_reason, "Messages reply stop reason");
                }
                StreamEvent::MessageStop => return content.finish(),
                StreamEvent::Error { error } => {
                    return Err(RuntimeError::RequestFailed(error.message));
                }
                StreamEvent::Other => {}
            }
        }
    }

    content.finish()
}

/// Blocks indexed as the stream announces them, each with the raw
/// `input_json_delta` text received so far.
#[derive(Default)]
struct StreamedContent {
    blocks: Vec<(Block, String)>,
}

impl StreamedContent {
    fn start(&mut self, index: usize, block: Block) {
        while self.blocks.len() <= index {
            self.blocks.push((Block::Unsupported, String::new()));
        }
        self.blocks[index] = (block, String::new());
    }

    fn apply(&mut self, index: usize, delta: BlockDelta, events: &dyn ShellEventSink) {
        match (self.blocks.get_mut(index), delta) {
            (Some((Block::Text { text }, _)), BlockDelta::TextDelta { text: piece }) => {
                if !piece.is_empty() {
                    text.push_str(&piece);
                    events.emit(ShellEvent::ResponseDelta { text: piece });
                }
            }
            (Some((Block::ToolUse { .. }, json)), BlockDelta::InputJsonDelta { partial_json }) => {
                json.push_str(&partial_json);
            }
            _ => {}
        }
    }

    fn finish(self) -> Result<Vec<Block>, RuntimeError> {
        self.blocks
            .into_iter()
            .map(|(block, json)| match block {
                Block::ToolUse { id, name, input } => {
                    let input = if json.trim().is_empty() {
                        match input {
                            Value::Null => Value::Object(Default::default()),
                            input => input,
                        }
                    } else {
                        serde_json::from_str(&json).map_err(|e| {
                            RuntimeError::InvalidResponse(format!(
                                "input for tool '{}' is not valid JSON: {}",
                                name, e
                            ))
                        })?
                    };
                    Ok(Block::ToolUse { id, name, input })
                }
                other => Ok(other),
            })
            .collect()
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "no_system")]
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [Value],
    temperature: f32,
    stream: bool,
}

fn no_system(system: &&str) -> bool {
    system.is_empty()
}

fn no_tools(tools: &&[Value]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
    /// Thinking, images and anything else this shell does not replay
    #[serde(other)]
    Unsupported,
}

impl Block {
    /// Whether the block can be sent back as assistant content
    fn is_replayable(&self) -> bool {
        match self {
            Block::Text { text } => !text.is_empty(),
            Block::ToolUse { .. } => true,
            Block::ToolResult { .. } | Block::Unsupported => false,
        }
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<Block>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockStart { index: usize, content_block: Block },
    ContentBlockDelta { index: usize, delta: BlockDelta },
    MessageDelta { delta: MessageDeltaBody },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        partial_json: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct MessageDeltaBody {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}
