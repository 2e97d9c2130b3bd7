//! API error responses.
//!
//! Every failure is rendered with the same envelope:
//! `{"error": "<message>", "code": "<code>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::GatewayError;
use serde::{Deserialize, Serialize};

/// Error returned by handlers.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Stable machine-readable code
    pub code: &'static str,
    /// Human-readable message
    pub message: String,
}

/// JSON error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    pub error: String,
    /// Stable machine-readable code
    pub code: String,
}

impl ApiError {
    /// Create an error
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 400 `invalid_request`
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }

    /// 500 `internal_error`
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match &err {
            // Validation messages are already caller-facing
            GatewayError::Validation { message, .. }
            | GatewayError::Unauthorized { message }
            | GatewayError::Forbidden { message } => message.clone(),
            // Configuration details stay in the logs
            GatewayError::Configuration { .. } | GatewayError::Internal { .. } => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        Self::new(status, err.error_code(), message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}
