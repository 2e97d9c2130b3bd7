//! Upstream failure classification shared by all adapters.
//!
//! - 401/403 from the upstream: the credential was rejected.
//! - Any other non-success status, wrong content type or undecodable stream:
//!   protocol failure.
//! - Connect, timeout and mid-body transport failures: upstream unavailable.

use gateway_core::{GatewayError, ProviderKind};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Gemini's reason for a rejected key, reported with HTTP 400.
const GEMINI_INVALID_KEY: &str = "API_KEY_INVALID";

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Both shapes an error body arrives in. The list comes first: serde also
/// accepts a JSON array for a struct, positionally.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    List(Vec<ErrorEnvelope>),
    Single(ErrorEnvelope),
}

/// Pull a human-readable message out of an upstream error body.
///
/// All four upstreams wrap errors as `{"error": {"message": ...}}`; Gemini's
/// streaming endpoint wraps that object in an array.
fn upstream_message(body: &str) -> Option<String> {
    let envelope = match serde_json::from_str::<ErrorPayload>(body).ok()? {
        ErrorPayload::List(list) => list.into_iter().next()?,
        ErrorPayload::Single(envelope) => envelope,
    };
    envelope.error.message
}

/// Gemini answers a bad key with 400 `INVALID_ARGUMENT` instead of 401.
fn is_gemini_key_rejection(provider: ProviderKind, status: StatusCode, body: &str) -> bool {
    provider == ProviderKind::Gemini
        && status == StatusCode::BAD_REQUEST
        && (body.contains(GEMINI_INVALID_KEY) || body.contains("API key not valid"))
}

/// Map a non-success upstream status and its body.
pub(crate) fn status_error(provider: ProviderKind, status: StatusCode, body: &str) -> GatewayError {
    let detail = upstream_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    });
    let message = format!("HTTP {}: {detail}", status.as_u16());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GatewayError::upstream_auth(provider, message)
        }
        _ if is_gemini_key_rejection(provider, status, body) => {
            GatewayError::upstream_auth(provider, message)
        }
        _ => GatewayError::upstream_protocol(provider, message, Some(status.as_u16())),
    }
}

/// Map a failed upstream response, consuming its body.
pub(crate) async fn response_error(provider: ProviderKind, response: Response) -> GatewayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    debug!(provider = provider.as_str(), status = status.as_u16(), "Upstream returned an error status");
    status_error(provider, status, &body)
}

/// Map a reqwest transport failure.
pub(crate) fn transport_error(provider: ProviderKind, err: reqwest::Error) -> GatewayError {
    // Request URLs never carry credentials, but keep them out of messages anyway
    let err = err.without_url();
    if err.is_timeout() {
        GatewayError::upstream_unavailable(provider, format!("request timed out: {err}"))
    } else if err.is_decode() {
        GatewayError::upstream_protocol(provider, format!("undecodable response: {err}"), None)
    } else {
        GatewayError::upstream_unavailable(provider, err.to_string())
    }
}

/// Map an event-source failure. `StreamEnded` is not an error and is handled
/// by the caller.
pub(crate) async fn event_source_error(
    provider: ProviderKind,
    err: reqwest_eventsource::Error,
) -> GatewayError {
    use reqwest_eventsource::Error;

    match err {
        Error::InvalidStatusCode(_, response) => response_error(provider, response).await,
        Error::InvalidContentType(content_type, response) => GatewayError::upstream_protocol(
            provider,
            format!(
                "unexpected content type {:?}",
                content_type.to_str().unwrap_or("<binary>")
            ),
            Some(response.status().as_u16()),
        ),
        Error::Transport(e) => transport_error(provider, e),
        Error::Utf8(e) => {
            GatewayError::upstream_protocol(provider, format!("invalid UTF-8 in event stream: {e}"), None)
        }
        Error::Parser(e) => {
            GatewayError::upstream_protocol(provider, format!("malformed event stream: {e}"), None)
        }
        other => GatewayError::upstream_protocol(provider, other.to_string(), None),
    }
}
