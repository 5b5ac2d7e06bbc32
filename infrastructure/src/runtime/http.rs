//! Plumbing shared by the HTTP runtimes: settings, client construction,
//! transport error mapping and server-sent-event line decoding.

use agentsh_application::RuntimeError;
use reqwest::Client;
use std::time::Duration;

/// Largest partial SSE line kept while waiting for its newline
const MAX_SSE_LINE: usize = 1024 * 1024;

/// Connection and sampling settings for the HTTP runtimes
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Provider label used in logs and banners
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_tool_rounds: usize,
    pub request_timeout: Duration,
    /// Ask the provider for an incremental event stream
    pub stream: bool,
}

impl ChatSettings {
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            max_tokens: 4096,
            temperature: 0.7,
            max_tool_rounds: 8,
            request_timeout: Duration::from_secs(120),
            stream: true,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// `base_url` joined with `path`
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

pub(crate) fn build_client(settings: &ChatSettings) -> Result<Client, RuntimeError> {
    Client::builder()
        .timeout(settings.request_timeout)
        .build()
        .map_err(|e| RuntimeError::Other(format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn map_transport_error(e: reqwest::Error) -> RuntimeError {
    if e.is_timeout() {
        RuntimeError::Timeout
    } else if e.is_connect() {
        RuntimeError::ConnectionError(e.to_string())
    } else {
        RuntimeError::RequestFailed(e.to_string())
    }
}

/// Splits a byte stream into SSE `data:` payloads.
///
/// Bytes are buffered until a full line arrives, so multi-byte characters
/// split across network chunks decode intact. `event:`, `id:` and comment
/// lines are dropped; both providers repeat the event type in the payload.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, RuntimeError> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }

        if self.buffer.len() > MAX_SSE_LINE {
            return Err(RuntimeError::InvalidResponse(
                "event stream line exceeds 1 MiB".to_string(),
            ));
        }
        Ok(payloads)
    }
}
