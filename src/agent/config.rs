//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::document::DocumentsConfig;
use crate::error::AgentError;
use crate::search::SearchConfig;

/// Default model identifier.
const DEFAULT_MODEL: &str = "gpt-4o";
/// Default maximum tokens per model response.
const DEFAULT_MAX_TOKENS: u32 = 5000;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default maximum model requests per dialogue.
pub const DEFAULT_ROUND_LIMIT: usize = 10;

/// Configuration for the dialogue system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens per model response.
    pub max_tokens: u32,
    /// Sampling temperature. Provider default when unset.
    pub temperature: Option<f32>,
    /// Timeout for a single model request.
    pub timeout: Duration,
    /// Maximum model requests per dialogue.
    pub round_limit: usize,
    /// File holding a system prompt that replaces the built-in one.
    pub system_prompt_file: Option<PathBuf>,
    /// Document source.
    pub documents: DocumentsConfig,
    /// Search tool defaults.
    pub search: SearchConfig,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    round_limit: Option<usize>,
    system_prompt_file: Option<PathBuf>,
    documents: Option<DocumentsConfig>,
    search: Option<SearchConfig>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("PDF_DIALOGUE_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("PDF_DIALOGUE_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("PDF_DIALOGUE_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("PDF_DIALOGUE_MODEL").ok();
        }
        if self.max_tokens.is_none() {
            self.max_tokens = std::env::var("PDF_DIALOGUE_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.temperature.is_none() {
            self.temperature = std::env::var("PDF_DIALOGUE_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.round_limit.is_none() {
            self.round_limit = std::env::var("PDF_DIALOGUE_MAX_ROUNDS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.system_prompt_file.is_none() {
            self.system_prompt_file = std::env::var("PDF_DIALOGUE_PROMPT_FILE").ok().map(PathBuf::from);
        }
        if self.documents.is_none() {
            self.documents = Some(DocumentsConfig::builder().from_env().build());
        }
        if self.search.is_none() {
            self.search = Some(SearchConfig::from_env());
        }
        self
    }

    /// Sets the model provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum tokens per response.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the maximum model requests per dialogue.
    #[must_use]
    pub const fn round_limit(mut self, n: usize) -> Self {
        self.round_limit = Some(n);
        self
    }

    /// Sets the system prompt file.
    #[must_use]
    pub fn system_prompt_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.system_prompt_file = Some(path.into());
        self
    }

    /// Sets the document source.
    #[must_use]
    pub fn documents(mut self, documents: DocumentsConfig) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Sets the search defaults.
    #[must_use]
    pub const fn search(mut self, search: SearchConfig) -> Self {
        self.search = Some(search);
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set, or
    /// [`AgentError::InvalidInput`] if the round limit is zero.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;
        let round_limit = self.round_limit.unwrap_or(DEFAULT_ROUND_LIMIT);
        if round_limit == 0 {
            return Err(AgentError::InvalidInput {
                message: "round limit must be at least 1".to_string(),
            });
        }

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.temperature,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            round_limit,
            system_prompt_file: self.system_prompt_file,
            documents: self.documents.unwrap_or_default(),
            search: self.search.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.round_limit, DEFAULT_ROUND_LIMIT);
        assert_eq!(config.documents, DocumentsConfig::default());
        assert_eq!(config.search, SearchConfig::default());
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_builder_rejects_zero_rounds() {
        let result = AgentConfig::builder().api_key("k").round_limit(0).build();
        assert!(matches!(result, Err(AgentError::InvalidInput { .. })));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .provider("custom")
            .model("gpt-4o-mini")
            .temperature(0.2)
            .round_limit(3)
            .timeout(Duration::from_secs(30))
            .documents(DocumentsConfig::new("/srv/papers"))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "custom");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.round_limit, 3);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.documents.root, PathBuf::from("/srv/papers"));
    }
}
