use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
    Client as OpenAiClient,
};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rag_core::GenerationError;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::generator::Generator;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const OLLAMA_API_BASE: &str = "http://localhost:11434/v1";
pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";

/// Model used for the bare `anthropic/claude` name
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Supported LLM providers. All speak the OpenAI chat-completions protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    /// Local Ollama server through its OpenAI-compatible endpoint
    Ollama,
    /// Claude models through Anthropic's OpenAI-compatible endpoint
    Anthropic,
}

impl LlmProvider {
    pub fn default_api_base(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => OPENAI_API_BASE,
            LlmProvider::Ollama => OLLAMA_API_BASE,
            LlmProvider::Anthropic => ANTHROPIC_API_BASE,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        self.api_key_env().is_some()
    }

    /// Environment variable conventionally holding this provider's key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Ollama => None,
            LlmProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::OpenAI => write!(f, "openai"),
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// A model selected by name, e.g. `openai/gpt-4`, `ollama/llama3` or
/// `anthropic/claude`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: LlmProvider,
    pub model: String,
}

impl ModelSpec {
    /// Parse a `<provider>/<model>` name.
    ///
    /// `anthropic/claude` selects [`DEFAULT_ANTHROPIC_MODEL`]. Local weights
    /// (`hf/…`) and any other provider are `UnsupportedModel`.
    pub fn parse(name: &str) -> Result<Self, GenerationError> {
        let (provider, model) = name
            .split_once('/')
            .ok_or_else(|| GenerationError::UnsupportedModel(name.to_string()))?;

        if model.trim().is_empty() {
            return Err(GenerationError::UnsupportedModel(name.to_string()));
        }

        let provider = match provider.to_lowercase().as_str() {
            "openai" => LlmProvider::OpenAI,
            "ollama" => LlmProvider::Ollama,
            "anthropic" => LlmProvider::Anthropic,
            _ => return Err(GenerationError::UnsupportedModel(name.to_string())),
        };

        let model = match (provider, model) {
            (LlmProvider::Anthropic, "claude") => DEFAULT_ANTHROPIC_MODEL.to_string(),
            (_, model) => model.to_string(),
        };

        Ok(Self { provider, model })
    }
}

/// Configuration for the LLM client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// Overrides the provider's default endpoint
    pub api_base: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub requests_per_minute: u32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            model: "gpt-4-turbo".to_string(),
            api_base: None,
            max_tokens: 500,
            temperature: 0.1,
            requests_per_minute: 10,
            timeout_seconds: 30,
        }
    }
}

impl LlmConfig {
    /// Default configuration for a model selected by name
    pub fn for_model(name: &str) -> Result<Self, GenerationError> {
        let spec = ModelSpec::parse(name)?;
        Ok(Self {
            provider: spec.provider,
            model: spec.model,
            ..Default::default()
        })
    }

    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_base())
    }
}

/// Response from the LLM with metadata
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub model: String,
    pub tokens_used: Option<u32>,
    pub provider: LlmProvider,
}

/// Chat-completions client with rate limiting and a per-request timeout.
///
/// Failed calls are returned to the caller as-is; retry policy belongs to
/// whoever owns the query.
pub struct LlmClient {
    client: OpenAiClient<OpenAIConfig>,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    config: LlmConfig,
    name: String,
}

impl LlmClient {
    /// Create a new LLM client from configuration
    ///
    /// # Arguments
    /// * `config` - LLM configuration
    /// * `api_key` - API key; required for OpenAI and Anthropic, ignored by Ollama
    pub fn new(config: LlmConfig, api_key: Option<String>) -> Result<Self, GenerationError> {
        tracing::info!(
            "Initializing LLM client: provider={}, model={}, api_base={}, rate_limit={}/min",
            config.provider,
            config.model,
            config.api_base(),
            config.requests_per_minute
        );

        let api_key = match (api_key.filter(|key| !key.is_empty()), config.provider) {
            (Some(key), _) => key,
            (None, provider) if provider.requires_api_key() => {
                return Err(GenerationError::Configuration(format!(
                    "API key required for provider {}",
                    provider
                )))
            }
            // Ollama accepts any bearer token
            (None, _) => "ollama".to_string(),
        };

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(config.api_base());
        let client = OpenAiClient::with_config(openai_config);

        let requests_per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
            GenerationError::Configuration("requests_per_minute must be > 0".to_string())
        })?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(requests_per_minute)));

        let name = format!("{}/{}", config.provider, config.model);
        tracing::info!("LLM client initialized successfully");

        Ok(Self {
            client,
            rate_limiter,
            config,
            name,
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Send one prompt and return the completion with metadata
    pub async fn complete(&self, prompt: &str) -> Result<LlmResponse, GenerationError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("Sending prompt to LLM (length: {} chars)", prompt.len());

        let request = CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    name: None,
                },
            )],
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            ..Default::default()
        };

        let response = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_seconds),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| GenerationError::Timeout {
            seconds: self.config.timeout_seconds,
        })?
        .map_err(|e| GenerationError::Provider(e.to_string()))?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        let llm_response = LlmResponse {
            text,
            model: response.model.clone(),
            tokens_used: response.usage.map(|u| u.total_tokens),
            provider: self.config.provider,
        };

        tracing::info!(
            "LLM response received: model={}, tokens={:?}, length={} chars",
            llm_response.model,
            llm_response.tokens_used,
            llm_response.text.len()
        );

        Ok(llm_response)
    }
}

#[async_trait]
impl Generator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        Ok(self.complete(prompt).await?.text)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LlmConfig::default();
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.model, "gpt-4-turbo");
        assert_eq!(config.max_tokens, 500);
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.requests_per_minute, 10);
        assert_eq!(config.api_base(), OPENAI_API_BASE);
    }

    #[test]
    fn test_parse_model_names() {
        let spec = ModelSpec::parse("openai/gpt-4").unwrap();
        assert_eq!(spec.provider, LlmProvider::OpenAI);
        assert_eq!(spec.model, "gpt-4");

        let spec = ModelSpec::parse("ollama/llama3:8b").unwrap();
        assert_eq!(spec.provider, LlmProvider::Ollama);
        assert_eq!(spec.model, "llama3:8b");
    }

    #[test]
    fn test_parse_anthropic_models() {
        let spec = ModelSpec::parse("anthropic/claude").unwrap();
        assert_eq!(spec.provider, LlmProvider::Anthropic);
        assert_eq!(spec.model, DEFAULT_ANTHROPIC_MODEL);

        let spec = ModelSpec::parse("Anthropic/claude-3-5-haiku-latest").unwrap();
        assert_eq!(spec.provider, LlmProvider::Anthropic);
        assert_eq!(spec.model, "claude-3-5-haiku-latest");
    }

    #[test]
    fn test_anthropic_client_config() {
        let config = LlmConfig::for_model("anthropic/claude").unwrap();
        assert_eq!(config.api_base(), ANTHROPIC_API_BASE);
        assert_eq!(config.provider.api_key_env(), Some("ANTHROPIC_API_KEY"));

        let err = LlmClient::new(config.clone(), None).err().unwrap();
        assert!(matches!(err, GenerationError::Configuration(_)));

        let client = LlmClient::new(config, Some("sk-ant-test".to_string())).unwrap();
        assert_eq!(client.name(), format!("anthropic/{}", DEFAULT_ANTHROPIC_MODEL));
    }

    #[test]
    fn test_unsupported_model_names() {
        for name in ["hf/meta-llama/Llama-2-7b", "cohere/command", "gpt-4", "openai/", "anthropic/"] {
            assert!(
                matches!(
                    ModelSpec::parse(name),
                    Err(GenerationError::UnsupportedModel(_))
                ),
                "{} should be unsupported",
                name
            );
        }
    }

    #[test]
    fn test_config_for_ollama_model() {
        let config = LlmConfig::for_model("ollama/mistral").unwrap();
        assert_eq!(config.provider, LlmProvider::Ollama);
        assert_eq!(config.model, "mistral");
        assert_eq!(config.api_base(), OLLAMA_API_BASE);

        let custom = LlmConfig {
            api_base: Some("http://gpu-box:11434/v1".to_string()),
            ..config
        };
        assert_eq!(custom.api_base(), "http://gpu-box:11434/v1");
    }

    #[test]
    fn test_openai_requires_api_key() {
        let err = LlmClient::new(LlmConfig::default(), None).err().unwrap();
        assert!(matches!(err, GenerationError::Configuration(_)));

        let err = LlmClient::new(LlmConfig::default(), Some(String::new()))
            .err()
            .unwrap();
        assert!(matches!(err, GenerationError::Configuration(_)));
    }

    #[test]
    fn test_ollama_client_without_key() {
        let client = LlmClient::new(LlmConfig::for_model("ollama/llama3").unwrap(), None).unwrap();
        assert_eq!(client.name(), "ollama/llama3");
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let config = LlmConfig {
            requests_per_minute: 0,
            ..Default::default()
        };
        let err = LlmClient::new(config, Some("sk-test".to_string())).err().unwrap();
        assert_eq!(
            err,
            GenerationError::Configuration("requests_per_minute must be > 0".to_string())
        );
    }

    #[tokio::test]
    #[ignore] // Requires OPENAI_API_KEY and network access
    async fn test_live_completion() {
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        let client = LlmClient::new(LlmConfig::default(), api_key).unwrap();
        let answer = client.generate("Reply with the word pong.").await.unwrap();
        assert!(!answer.is_empty());
    }
}
