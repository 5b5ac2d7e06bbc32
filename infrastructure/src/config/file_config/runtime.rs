//! Reasoning runtime configuration from TOML (`[runtime]` section)
//!
//! ```toml
//! [runtime]
//! provider = "openrouter"
//! model = "anthropic/claude-sonnet-4"
//! max_tool_rounds = 8
//! ```

use super::ConfigValidationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported runtime providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeProvider {
    OpenAi,
    /// Anthropic Messages API
    Anthropic,
    OpenRouter,
    Ollama,
    /// Offline provider that echoes requests and runs `!tool` commands
    Echo,
}

impl RuntimeProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeProvider::OpenAi => "openai",
            RuntimeProvider::Anthropic => "anthropic",
            RuntimeProvider::OpenRouter => "openrouter",
            RuntimeProvider::Ollama => "ollama",
            RuntimeProvider::Echo => "echo",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            RuntimeProvider::OpenAi => "https://api.openai.com/v1",
            RuntimeProvider::Anthropic => "https://api.anthropic.com/v1",
            RuntimeProvider::OpenRouter => "https://openrouter.ai/api/v1",
            RuntimeProvider::Ollama => "http://localhost:11434/v1",
            RuntimeProvider::Echo => "",
        }
    }

    /// Environment variable holding the API key, if the provider needs one
    pub fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            RuntimeProvider::OpenAi => Some("OPENAI_API_KEY"),
            RuntimeProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            RuntimeProvider::OpenRouter => Some("OPENROUTER_API_KEY"),
            RuntimeProvider::Ollama | RuntimeProvider::Echo => None,
        }
    }

    /// Model used when `runtime.model` is empty
    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            RuntimeProvider::OpenAi => Some("gpt-4o"),
            RuntimeProvider::Anthropic => Some("claude-sonnet-4-20250514"),
            RuntimeProvider::OpenRouter | RuntimeProvider::Ollama | RuntimeProvider::Echo => None,
        }
    }
}

impl FromStr for RuntimeProvider {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(RuntimeProvider::OpenAi),
            "anthropic" | "claude" => Ok(RuntimeProvider::Anthropic),
            "openrouter" => Ok(RuntimeProvider::OpenRouter),
            "ollama" => Ok(RuntimeProvider::Ollama),
            "echo" | "offline" => Ok(RuntimeProvider::Echo),
            other => Err(ConfigValidationError::UnknownProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for RuntimeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw runtime configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRuntimeConfig {
    /// openai | anthropic | openrouter | ollama | echo
    pub provider: String,
    /// Empty means the provider's default model
    pub model: String,
    /// Empty means the provider's default endpoint
    pub base_url: String,
    /// Empty means the provider's default variable
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on model ↔ tool round trips per turn
    pub max_tool_rounds: usize,
    pub request_timeout_secs: u64,
    /// Print the reply as it arrives instead of all at once
    pub stream: bool,
}

impl Default for FileRuntimeConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: String::new(),
            base_url: String::new(),
            api_key_env: String::new(),
            max_tokens: 4096,
            temperature: 0.7,
            max_tool_rounds: 8,
            request_timeout_secs: 120,
            stream: true,
        }
    }
}

impl FileRuntimeConfig {
    pub fn provider_kind(&self) -> Result<RuntimeProvider, ConfigValidationError> {
        self.provider.parse()
    }

    pub fn effective_model(&self, provider: RuntimeProvider) -> String {
        match self.model.trim() {
            "" => provider.default_model().unwrap_or_default().to_string(),
            model => model.to_string(),
        }
    }

    pub fn effective_base_url(&self, provider: RuntimeProvider) -> String {
        if self.base_url.trim().is_empty() {
            provider.default_base_url().to_string()
        } else {
            self.base_url.trim().trim_end_matches('/').to_string()
        }
    }

    pub fn effective_api_key_env(&self, provider: RuntimeProvider) -> Option<String> {
        if self.api_key_env.trim().is_empty() {
            provider.default_api_key_env().map(str::to_string)
        } else {
            Some(self.api_key_env.trim().to_string())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let provider = self.provider_kind()?;
        if provider != RuntimeProvider::Echo && self.effective_model(provider).is_empty() {
            return Err(ConfigValidationError::EmptyModelName);
        }
        if self.max_tool_rounds == 0 {
            return Err(ConfigValidationError::InvalidToolRounds);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<RuntimeProvider>().unwrap(), RuntimeProvider::OpenAi);
        assert_eq!("echo".parse::<RuntimeProvider>().unwrap(), RuntimeProvider::Echo);
        assert_eq!(
            "Anthropic".parse::<RuntimeProvider>().unwrap(),
            RuntimeProvider::Anthropic
        );
        assert!(matches!(
            "bedrock".parse::<RuntimeProvider>(),
            Err(ConfigValidationError::UnknownProvider(p)) if p == "bedrock"
        ));
    }

    #[test]
    fn test_effective_defaults() {
        let config = FileRuntimeConfig::default();
        assert_eq!(
            config.effective_base_url(RuntimeProvider::OpenRouter),
            "https://openrouter.ai/api/v1"
        );
        assert_eq!(
            config.effective_api_key_env(RuntimeProvider::OpenAi).as_deref(),
            Some("OPENAI_API_KEY")
        );
        assert!(config.effective_api_key_env(RuntimeProvider::Ollama).is_none());
        assert_eq!(
            config.effective_api_key_env(RuntimeProvider::Anthropic).as_deref(),
            Some("ANTHROPIC_API_KEY")
        );
        assert!(config.stream);
        assert_eq!(config.effective_model(RuntimeProvider::OpenAi), "gpt-4o");
        assert_eq!(
            config.effective_model(RuntimeProvider::Anthropic),
            "claude-sonnet-4-20250514"
        );
        assert_eq!(config.effective_model(RuntimeProvider::Ollama), "");

        let custom = FileRuntimeConfig {
            base_url: "http://proxy.local/v1/".into(),
            api_key_env: "MY_KEY".into(),
            ..Default::default()
        };
        assert_eq!(
            custom.effective_base_url(RuntimeProvider::OpenAi),
            "http://proxy.local/v1"
        );
        assert_eq!(
            custom.effective_api_key_env(RuntimeProvider::Ollama).as_deref(),
            Some("MY_KEY")
        );
    }

    #[test]
    fn test_validate() {
        assert!(FileRuntimeConfig::default().validate().is_ok());

        // Providers without a default model need one configured
        let empty_model = FileRuntimeConfig {
            provider: "ollama".into(),
            model: " ".into(),
            ..Default::default()
        };
        assert!(matches!(
            empty_model.validate(),
            Err(ConfigValidationError::EmptyModelName)
        ));

        let anthropic = FileRuntimeConfig {
            provider: "anthropic".into(),
            ..Default::default()
        };
        assert!(anthropic.validate().is_ok());

        let echo = FileRuntimeConfig {
            provider: "echo".into(),
            model: String::new(),
            ..Default::default()
        };
        assert!(echo.validate().is_ok());

        let zero_rounds = FileRuntimeConfig {
            max_tool_rounds: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_rounds.validate(),
            Err(ConfigValidationError::InvalidToolRounds)
        ));
    }
}
