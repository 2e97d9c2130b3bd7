//! OpenAI chat completions adapter.
//!
//! Streams `POST {base}/chat/completions` with `stream: true`. Every SSE
//! message is a `chat.completion.chunk`; the text fragment lives at
//! `choices[0].delta.content` and the stream ends with `data: [DONE]`.

use crate::config::AdapterConfig;
use crate::sse::{event_stream, StreamEnd};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use gateway_core::{
    Credential, DeltaEvent, DeltaStream, GatewayError, ProviderAdapter, ProviderKind,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// OpenAI adapter
pub struct OpenAiAdapter {
    config: AdapterConfig,
    client: Client,
}

impl OpenAiAdapter {
    /// Create a new OpenAI adapter
    ///
    /// # Errors
    /// Returns error if the settings are for another provider or the HTTP
    /// client cannot be created
    pub fn new(config: AdapterConfig) -> Result<Self, GatewayError> {
        config.ensure_kind(ProviderKind::ChatGpt)?;
        let client = config.build_client()?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ChatGpt
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn open_stream(
        &self,
        message: &str,
        credential: &Credential,
    ) -> Result<DeltaStream, GatewayError> {
        let body = ChatCompletionRequest::new(&self.config, message);
        debug!(model = %self.config.model, "Opening OpenAI stream");

        let request = self
            .client
            .post(self.completions_url())
            .bearer_auth(credential.expose())
            .json(&body);

        let mut events = event_stream(ProviderKind::ChatGpt, request, StreamEnd::Sentinel)?;

        let stream = try_stream! {
            while let Some(event) = events.next().await {
                let event = event?;
                match serde_json::from_str::<ChatCompletionChunk>(&event.data) {
                    Ok(chunk) => {
                        if let Some(content) = chunk.into_content() {
                            yield DeltaEvent::new(content);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed OpenAI chunk");
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

// ============================================================================
// Chat completions wire types (shared with OpenAI-compatible upstreams)
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [WireMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

impl<'a> ChatCompletionRequest<'a> {
    pub(crate) fn new(config: &'a AdapterConfig, message: &'a str) -> Self {
        Self {
            model: &config.model,
            messages: [WireMessage {
                role: "user",
                content: message,
            }],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            stream: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage<'a> {
    pub(crate) role: &'static str,
    pub(crate) content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    /// Non-empty text fragment of the first choice.
    pub(crate) fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}
