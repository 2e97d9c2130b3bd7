//! Custom Axum extractors for the gateway.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
};
use gateway_core::GatewayError;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{error::ApiError, session::UserIdentity, state::AppState};

/// Request ID header name
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Extract request ID from headers or generate one
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .or_else(|| parts.headers.get("x-correlation-id"))
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

        Ok(Self(id))
    }
}

/// The user identified by the configured session provider
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserIdentity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = state.sessions.identify(&parts.headers).await?;
        Ok(Self(identity))
    }
}

/// JSON body extractor that reports failures with the gateway error envelope
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> axum::extract::FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read request body: {e}")))?;

        let value: T = serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "JSON parse error");
            ApiError::from(GatewayError::validation(format!("Invalid JSON: {e}"), None))
        })?;

        Ok(Self(value))
    }
}
