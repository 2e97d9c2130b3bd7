//! Provider identifiers and the adapter trait every upstream implements.

use crate::credential::Credential;
use crate::error::GatewayError;
use crate::streaming::DeltaEvent;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lazy sequence of canonical delta events produced by one adapter.
pub type DeltaStream = BoxStream<'static, Result<DeltaEvent, GatewayError>>;

/// Known upstream providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions
    #[serde(rename = "chatgpt")]
    ChatGpt,
    /// Google Gemini
    Gemini,
    /// Anthropic Claude
    Claude,
    /// Perplexity
    Perplexity,
}

impl ProviderKind {
    /// All providers, in a stable order.
    pub const ALL: [Self; 4] = [Self::ChatGpt, Self::Gemini, Self::Claude, Self::Perplexity];

    /// Identifier used on the wire (`chatgpt`, `gemini`, `claude`, `perplexity`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatGpt => "chatgpt",
            Self::Gemini => "gemini",
            Self::Claude => "claude",
            Self::Perplexity => "perplexity",
        }
    }

    /// Vendor name used in user-facing messages.
    #[must_use]
    pub fn vendor(self) -> &'static str {
        match self {
            Self::ChatGpt => "OpenAI",
            Self::Gemini => "Google AI",
            Self::Claude => "Anthropic",
            Self::Perplexity => "Perplexity",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.vendor())
    }
}

impl FromStr for ProviderKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GatewayError::unsupported_provider(s))
    }
}

/// One upstream text-generation service behind a single streaming contract.
///
/// Implementations own their HTTP client and know the upstream's request
/// shape and incremental response framing. Callers only see canonical
/// [`DeltaEvent`]s.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider this adapter talks to.
    fn kind(&self) -> ProviderKind;

    /// Upstream model name requests are sent with.
    fn model(&self) -> &str;

    /// Open a streaming generation for a single user message.
    ///
    /// Errors returned here happen before any fragment exists. Errors yielded
    /// by the returned stream end it; nothing is retried.
    async fn open_stream(
        &self,
        message: &str,
        credential: &Credential,
    ) -> Result<DeltaStream, GatewayError>;
}
