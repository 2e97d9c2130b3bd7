//! Request types for the gateway.
//!
//! [`ChatStreamBody`] is the inbound JSON as sent by the chat UI; every field
//! is optional so that missing values surface as validation errors rather
//! than opaque deserialization failures. [`GenerationRequest`] is the
//! validated, immutable form the rest of the gateway works with.

use crate::error::GatewayError;
use crate::provider::ProviderKind;
use secrecy::SecretString;
use serde::Deserialize;

/// Inbound chat request body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamBody {
    /// The user's message
    #[serde(default)]
    pub message: Option<String>,

    /// Provider identifier (`chatgpt`, `gemini`, `claude`, `perplexity`)
    #[serde(default)]
    pub provider: Option<String>,

    /// Optional caller-supplied provider key
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

impl ChatStreamBody {
    /// Validate the body into a [`GenerationRequest`].
    pub fn into_request(self) -> Result<GenerationRequest, GatewayError> {
        GenerationRequest::new(
            self.message.unwrap_or_default(),
            self.provider.as_deref().unwrap_or_default(),
            self.api_key,
        )
    }
}

/// A validated single-turn generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    message: String,
    provider: ProviderKind,
    caller_key: Option<SecretString>,
}

impl GenerationRequest {
    /// Validate and construct a request.
    ///
    /// # Errors
    /// - `Validation` when the message or provider is missing
    /// - `UnsupportedProvider` when the provider is not a known identifier
    pub fn new(
        message: impl Into<String>,
        provider: &str,
        caller_key: Option<SecretString>,
    ) -> Result<Self, GatewayError> {
        let message = message.into();

        if message.trim().is_empty() {
            return Err(GatewayError::validation(
                "Missing message or provider",
                Some("message"),
            ));
        }

        if provider.is_empty() {
            return Err(GatewayError::validation(
                "Missing message or provider",
                Some("provider"),
            ));
        }

        let provider = provider.parse::<ProviderKind>()?;

        Ok(Self {
            message,
            provider,
            caller_key,
        })
    }

    /// The user's message, unmodified.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The selected provider.
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// The caller-supplied key, if any.
    #[must_use]
    pub fn caller_key(&self) -> Option<&SecretString> {
        self.caller_key.as_ref()
    }
}
