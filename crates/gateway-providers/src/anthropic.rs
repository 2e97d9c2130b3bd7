//! Anthropic Messages adapter.
//!
//! Streams `POST {base}/messages` with `stream: true`. The upstream sends
//! typed events; only `content_block_delta` events carrying a `text_delta`
//! produce output. Lifecycle events, pings, tool-input JSON deltas and event
//! kinds added later are ignored. An `error` event fails the stream.

use crate::config::AdapterConfig;
use crate::openai::WireMessage;
use crate::sse::{event_stream, StreamEnd};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use gateway_core::{
    Credential, DeltaEvent, DeltaStream, GatewayError, ProviderAdapter, ProviderKind,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Anthropic API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic adapter
pub struct AnthropicAdapter {
    config: AdapterConfig,
    client: Client,
}

impl AnthropicAdapter {
    /// Create a new Anthropic adapter
    ///
    /// # Errors
    /// Returns error if the settings are for another provider or the HTTP
    /// client cannot be created
    pub fn new(config: AdapterConfig) -> Result<Self, GatewayError> {
        config.ensure_kind(ProviderKind::Claude)?;
        let client = config.build_client()?;
        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.config.base_url)
    }

    fn build_request<'a>(&'a self, message: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.config.model,
            // The Messages API requires max_tokens
            max_tokens: self.config.max_tokens.unwrap_or(1000),
            messages: [WireMessage {
                role: "user",
                content: message,
            }],
            temperature: self.config.temperature,
            stream: true,
        }
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn open_stream(
        &self,
        message: &str,
        credential: &Credential,
    ) -> Result<DeltaStream, GatewayError> {
        let body = self.build_request(message);
        debug!(model = %self.config.model, "Opening Anthropic stream");

        let request = self
            .client
            .post(self.messages_url())
            .header("x-api-key", credential.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let mut events = event_stream(ProviderKind::Claude, request, StreamEnd::Close)?;

        let stream = try_stream! {
            while let Some(event) = events.next().await {
                let event = event?;
                match serde_json::from_str::<StreamEvent>(&event.data) {
                    Ok(StreamEvent::ContentBlockDelta { delta: BlockDelta::TextDelta { text } }) => {
                        if !text.is_empty() {
                            yield DeltaEvent::new(text);
                        }
                    }
                    Ok(StreamEvent::Error { error }) => {
                        Err(error.into_gateway_error())?;
                    }
                    Ok(_) => {
                        trace!(event = %event.event, "Ignoring Anthropic event");
                    }
                    Err(e) => {
                        warn!(error = %e, event = %event.event, "Skipping malformed Anthropic event");
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [WireMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: BlockDelta },
    Error { error: StreamError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

impl StreamError {
    fn into_gateway_error(self) -> GatewayError {
        let message = format!("{}: {}", self.kind, self.message);
        match self.kind.as_str() {
            "authentication_error" | "permission_error" => {
                GatewayError::upstream_auth(ProviderKind::Claude, message)
            }
            "overloaded_error" | "api_error" => {
                GatewayError::upstream_unavailable(ProviderKind::Claude, message)
            }
            _ => GatewayError::upstream_protocol(ProviderKind::Claude, message, None),
        }
    }
}
