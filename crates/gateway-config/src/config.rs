//! Configuration types.

use gateway_core::{CredentialResolver, ProviderKind};
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;
use validator::Validate;

/// Root gateway configuration.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server settings
    #[validate(nested)]
    pub server: ServerSettings,

    /// Per-provider upstream settings
    #[validate(nested)]
    pub providers: ProvidersConfig,

    /// Outbound stream settings
    pub stream: StreamSettings,

    /// Session and domain allow-list settings
    pub auth: AuthSettings,

    /// Logging settings
    pub logging: LoggingSettings,
}

impl GatewayConfig {
    /// Build the credential resolver from the configured provider keys.
    #[must_use]
    pub fn credential_resolver(&self) -> CredentialResolver {
        ProviderKind::ALL
            .into_iter()
            .fold(CredentialResolver::new(), |resolver, kind| {
                match self.providers.get(kind).api_key.clone() {
                    Some(key) => resolver.with_default(kind, key),
                    None => resolver,
                }
            })
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address
    pub host: String,

    /// Bind port
    #[validate(range(min = 1))]
    pub port: u16,

    /// Time allowed for in-flight streams to finish on shutdown
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerSettings {
    /// `host:port` string to bind to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings for all four providers.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ProvidersConfig {
    /// OpenAI
    #[validate(nested)]
    pub chatgpt: ProviderSettings,

    /// Google Gemini
    #[validate(nested)]
    pub gemini: ProviderSettings,

    /// Anthropic Claude
    #[validate(nested)]
    pub claude: ProviderSettings,

    /// Perplexity
    #[validate(nested)]
    pub perplexity: ProviderSettings,
}

impl ProvidersConfig {
    /// Settings for one provider.
    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::ChatGpt => &self.chatgpt,
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Claude => &self.claude,
            ProviderKind::Perplexity => &self.perplexity,
        }
    }

    /// Mutable settings for one provider.
    pub fn get_mut(&mut self, kind: ProviderKind) -> &mut ProviderSettings {
        match kind {
            ProviderKind::ChatGpt => &mut self.chatgpt,
            ProviderKind::Gemini => &mut self.gemini,
            ProviderKind::Claude => &mut self.claude,
            ProviderKind::Perplexity => &mut self.perplexity,
        }
    }

    /// Environment variable that holds the process-wide key by default.
    #[must_use]
    pub fn default_api_key_env(kind: ProviderKind) -> &'static str {
        match kind {
            ProviderKind::ChatGpt => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GOOGLE_AI_API_KEY",
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
            ProviderKind::Perplexity => "PERPLEXITY_API_KEY",
        }
    }
}

/// Upstream settings for one provider.
///
/// Unset values fall back to the adapter's built-in defaults.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ProviderSettings {
    /// Process-wide key (overridden by the caller's key per request)
    pub api_key: Option<SecretString>,

    /// Environment variable to read the process-wide key from
    pub api_key_env: Option<String>,

    /// Upstream base URL
    #[validate(url)]
    pub base_url: Option<String>,

    /// Upstream model
    #[validate(length(min = 1))]
    pub model: Option<String>,

    /// Maximum tokens to generate
    #[validate(range(min = 1, max = 32768))]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: Option<f32>,

    /// Upstream connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,

    /// Longest silence tolerated between upstream reads
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

/// Outbound stream settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Emit `data: [DONE]` after the last fragment of a complete answer
    pub completion_marker: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            completion_marker: true,
        }
    }
}

/// Session boundary settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Header carrying the authenticated user's e-mail
    pub user_header: String,

    /// E-mail domains allowed to use the gateway; empty allows any
    pub allowed_domains: Vec<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            user_header: "x-user-email".to_string(),
            allowed_domains: Vec::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive (RUST_LOG takes precedence)
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
