//! Google Gemini adapter.
//!
//! Streams `POST {base}/models/{model}:streamGenerateContent?alt=sse`. Each
//! SSE message is a `GenerateContentResponse`; its fragment is the
//! concatenated text of the first candidate's parts. The key travels in the
//! `x-goog-api-key` header, never in the query string.

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

/// Gemini adapter
pub struct GeminiAdapter {
    config: AdapterConfig,
    client: Client,
}

impl GeminiAdapter {
    /// Create a new Gemini adapter
    ///
    /// # Errors
    /// Returns error if the settings are for another provider or the HTTP
    /// client cannot be created
    pub fn new(config: AdapterConfig) -> Result<Self, GatewayError> {
        config.ensure_kind(ProviderKind::Gemini)?;
        let client = config.build_client()?;
        Ok(Self { config, client })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url, self.config.model
        )
    }

    fn build_request<'a>(&self, message: &'a str) -> GenerateContentRequest<'a> {
        let generation_config =
            if self.config.max_tokens.is_some() || self.config.temperature.is_some() {
                Some(GenerationConfig {
                    max_output_tokens: self.config.max_tokens,
                    temperature: self.config.temperature,
                })
            } else {
                None
            };

        GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: message }],
            }],
            generation_config,
        }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
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
        debug!(model = %self.config.model, "Opening Gemini stream");

        let request = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", credential.expose())
            .json(&body);

        let mut events = event_stream(ProviderKind::Gemini, request, StreamEnd::Close)?;

        let stream = try_stream! {
            while let Some(event) = events.next().await {
                let event = event?;
                match serde_json::from_str::<GenerateContentResponse>(&event.data) {
                    Ok(response) => {
                        if let Some(text) = response.into_text() {
                            yield DeltaEvent::new(text);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed Gemini chunk");
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text: String = candidate
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}
