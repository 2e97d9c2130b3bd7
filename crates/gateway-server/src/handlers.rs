//! HTTP request handlers for the gateway API.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use gateway_core::{
    ChatStreamBody, CredentialSource, DeltaEvent, DeltaStream, GatewayError, ProviderAdapter,
    ProviderKind,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    error::ApiError,
    extractors::{CurrentUser, JsonBody, RequestId},
    preferences::UserPreferences,
    state::AppState,
    stream::{collect_text, normalize, NormalizeOptions},
};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Version
    pub version: String,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.registry.is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "no providers available")
    } else {
        (StatusCode::OK, "ready")
    }
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = match &state.metrics {
        Some(metrics) => metrics
            .gather()
            .map_err(|e| ApiError::internal(format!("Failed to render metrics: {e}")))?,
        None => String::new(),
    };

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

/// An upstream stream that produced its first item (or ended cleanly).
struct OpenedStream {
    provider: ProviderKind,
    adapter: Arc<dyn ProviderAdapter>,
    source: CredentialSource,
    first: Option<DeltaEvent>,
    upstream: DeltaStream,
    started: Instant,
}

/// Validate, resolve the credential, open the upstream and wait for its
/// first item. Nothing has been sent to the caller yet, so every failure
/// here becomes a JSON error response.
async fn open_upstream(state: &AppState, body: ChatStreamBody) -> Result<OpenedStream, ApiError> {
    let request = body.into_request().map_err(|e| state.reject(None, e))?;
    let provider = request.provider();
    let reject = |e: GatewayError| state.reject(Some(provider), e);

    let adapter = state.registry.get(provider).map_err(reject)?;
    let credential = state
        .resolver
        .resolve(provider, request.caller_key())
        .map_err(reject)?;

    debug!(
        provider = %provider.as_str(),
        credential = credential.source().as_str(),
        "Opening upstream stream"
    );

    let started = Instant::now();
    let mut upstream = adapter
        .open_stream(request.message(), &credential)
        .await
        .map_err(reject)?;

    let first = match upstream.next().await {
        Some(Ok(event)) => Some(event),
        Some(Err(e)) => return Err(reject(e)),
        None => None,
    };

    state.observer.stream_opened(provider, credential.source());

    Ok(OpenedStream {
        provider,
        adapter,
        source: credential.source(),
        first,
        upstream,
        started,
    })
}

/// Streaming chat endpoint
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn chat_stream(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    JsonBody(body): JsonBody<ChatStreamBody>,
) -> Result<Response, ApiError> {
    let opened = open_upstream(&state, body).await?;

    info!(
        provider = %opened.provider.as_str(),
        model = %opened.adapter.model(),
        credential = opened.source.as_str(),
        "Streaming response"
    );

    let options = NormalizeOptions {
        completion_marker: state.config.stream.completion_marker,
        started: opened.started,
    };
    let body = normalize(
        opened.provider,
        opened.first,
        opened.upstream,
        options,
        state.observer.clone(),
    );

    let mut response = Response::new(Body::from_stream(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));

    Ok(response)
}

/// Non-streaming chat response
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The full answer
    pub content: String,
    /// Upstream model that produced it
    pub model: String,
    /// Provider id
    pub provider: ProviderKind,
}

/// Non-streaming chat endpoint
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn chat(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    JsonBody(body): JsonBody<ChatStreamBody>,
) -> Result<Json<ChatResponse>, ApiError> {
    let opened = open_upstream(&state, body).await?;
    let provider = opened.provider;

    let content = collect_text(
        provider,
        opened.first,
        opened.upstream,
        opened.started,
        state.observer.clone(),
    )
    .await?;

    Ok(Json(ChatResponse {
        content,
        model: opened.adapter.model().to_string(),
        provider,
    }))
}

/// Get the caller's preferences, or the defaults when none were saved
#[instrument(skip_all, fields(user = %user.email))]
pub async fn get_preferences(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserPreferences>, ApiError> {
    let preferences = state
        .preferences
        .get(&user.email)
        .await?
        .unwrap_or_default();
    Ok(Json(preferences))
}

/// Save the caller's preferences
#[instrument(skip_all, fields(user = %user.email))]
pub async fn save_preferences(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(preferences): JsonBody<UserPreferences>,
) -> Result<Json<UserPreferences>, ApiError> {
    let stored = state.preferences.upsert(&user.email, preferences).await?;
    debug!(mode = ?stored.mode, selected = ?stored.selected_llm, "Preferences saved");
    Ok(Json(stored))
}
