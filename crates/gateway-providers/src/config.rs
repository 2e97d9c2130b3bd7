//! Per-adapter upstream settings.

use gateway_core::{GatewayError, ProviderKind};
use reqwest::Client;
use std::time::Duration;

/// Connection and request-shape settings for one adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    /// Provider the settings apply to
    pub kind: ProviderKind,
    /// Base URL, without a trailing slash
    pub base_url: String,
    /// Upstream model
    pub model: String,
    /// Maximum tokens to generate, if the request shape carries it
    pub max_tokens: Option<u32>,
    /// Sampling temperature, if the request shape carries it
    pub temperature: Option<f32>,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Longest wait for the next read from the upstream. A streamed answer
    /// may run longer than this as long as bytes keep arriving.
    pub timeout: Duration,
}

impl AdapterConfig {
    /// Built-in defaults for a provider.
    #[must_use]
    pub fn for_provider(kind: ProviderKind) -> Self {
        let (base_url, model, max_tokens, temperature) = match kind {
            ProviderKind::ChatGpt => ("https://api.openai.com/v1", "gpt-4o-mini", Some(1000), Some(0.7)),
            ProviderKind::Gemini => (
                "https://generativelanguage.googleapis.com/v1beta",
                "gemini-1.5-flash",
                None,
                None,
            ),
            ProviderKind::Claude => (
                "https://api.anthropic.com/v1",
                "claude-3-5-sonnet-20241022",
                Some(1000),
                None,
            ),
            ProviderKind::Perplexity => (
                "https://api.perplexity.ai",
                "llama-3.1-sonar-small-128k-online",
                Some(1000),
                Some(0.7),
            ),
        };

        Self {
            kind,
            base_url: base_url.to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(120),
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the token limit
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the HTTP client an adapter owns.
    pub(crate) fn build_client(&self) -> Result<Client, GatewayError> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.timeout)
            .build()
            .map_err(|e| GatewayError::internal(format!("Failed to create HTTP client: {e}")))
    }

    /// Fail unless the settings are for `expected`.
    pub(crate) fn ensure_kind(&self, expected: ProviderKind) -> Result<(), GatewayError> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(GatewayError::configuration(format!(
                "{} settings passed to the {} adapter",
                self.kind.as_str(),
                expected.as_str()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let openai = AdapterConfig::for_provider(ProviderKind::ChatGpt);
        assert_eq!(openai.model, "gpt-4o-mini");
        assert_eq!(openai.max_tokens, Some(1000));
        assert_eq!(openai.temperature, Some(0.7));

        let gemini = AdapterConfig::for_provider(ProviderKind::Gemini);
        assert_eq!(gemini.model, "gemini-1.5-flash");
        assert_eq!(gemini.max_tokens, None);

        let claude = AdapterConfig::for_provider(ProviderKind::Claude);
        assert_eq!(claude.model, "claude-3-5-sonnet-20241022");
        assert_eq!(claude.temperature, None);

        let perplexity = AdapterConfig::for_provider(ProviderKind::Perplexity);
        assert_eq!(perplexity.base_url, "https://api.perplexity.ai");
        assert_eq!(perplexity.model, "llama-3.1-sonar-small-128k-online");
    }

    #[test]
    fn test_builder() {
        let config = AdapterConfig::for_provider(ProviderKind::Claude)
            .with_base_url("http://localhost:9999/v1/")
            .with_model("claude-3-5-haiku-20241022")
            .with_max_tokens(256)
            .with_temperature(0.2)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "http://localhost:9999/v1");
        assert_eq!(config.model, "claude-3-5-haiku-20241022");
        assert_eq!(config.max_tokens, Some(256));
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_ensure_kind() {
        let config = AdapterConfig::for_provider(ProviderKind::Gemini);
        assert!(config.ensure_kind(ProviderKind::Gemini).is_ok());
        assert!(matches!(
            config.ensure_kind(ProviderKind::ChatGpt),
            Err(GatewayError::Configuration { .. })
        ));
    }
}
