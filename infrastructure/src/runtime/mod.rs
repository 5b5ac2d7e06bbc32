//! Reasoning runtime adapters
//!
//! - [`OpenAiRuntime`]: OpenAI-compatible chat completions with function calling
//! - [`AnthropicRuntime`]: Anthropic Messages API with tool use
//! - [`EchoRuntime`]: offline provider for trying tools without a model

mod anthropic;
mod echo;
mod http;
mod openai;

pub use anthropic::{ANTHROPIC_VERSION, AnthropicRuntime};
pub use echo::EchoRuntime;
pub use http::ChatSettings;
pub use openai::OpenAiRuntime;

use crate::config::{FileRuntimeConfig, RuntimeProvider};
use agentsh_application::{ReasoningRuntime, RuntimeError};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the runtime selected by `[runtime]`.
///
/// Providers that need a key fail with [`RuntimeError::MissingCredentials`]
/// when the variable is unset or empty.
pub fn build_runtime(config: &FileRuntimeConfig) -> Result<Arc<dyn ReasoningRuntime>, RuntimeError> {
    build_runtime_with(config, |name| std::env::var(name).ok())
}

fn build_runtime_with(
    config: &FileRuntimeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn ReasoningRuntime>, RuntimeError> {
    let provider = config
        .provider_kind()
        .map_err(|e| RuntimeError::Other(e.to_string()))?;

    if provider == RuntimeProvider::Echo {
        info!("Using offline echo runtime");
        return Ok(Arc::new(EchoRuntime::new()));
    }

    let mut settings = ChatSettings::new(
        provider.as_str(),
        config.effective_base_url(provider),
        config.effective_model(provider),
    );
    settings.max_tokens = config.max_tokens;
    settings.temperature = config.temperature;
    settings.max_tool_rounds = config.max_tool_rounds;
    settings.request_timeout = Duration::from_secs(config.request_timeout_secs);
    settings.stream = config.stream;

    if let Some(var) = config.effective_api_key_env(provider) {
        match lookup(&var).filter(|key| !key.trim().is_empty()) {
            Some(key) => settings = settings.with_api_key(key.trim()),
            None if provider.default_api_key_env().is_some() => {
                return Err(RuntimeError::MissingCredentials(format!(
                    "set {} to use the {} provider",
                    var, provider
                )));
            }
            None => {}
        }
    }

    info!(
        provider = %provider,
        model = %settings.model,
        base_url = %settings.base_url,
        stream = settings.stream,
        "Using HTTP runtime"
    );
    if provider == RuntimeProvider::Anthropic {
        return Ok(Arc::new(AnthropicRuntime::new(settings)?));
    }
    Ok(Arc::new(OpenAiRuntime::new(settings)?))
}
