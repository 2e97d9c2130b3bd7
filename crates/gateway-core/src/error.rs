//! Error types for the gateway.
//!
//! Every failure a request can hit is one variant of [`GatewayError`]. The
//! server crate maps each variant onto an HTTP status and a stable error code.

use crate::provider::ProviderKind;
use thiserror::Error;

/// Result alias used across the gateway crates.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors produced while validating, resolving, or streaming a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The inbound request is missing a field or carries an invalid value.
    #[error("Invalid request: {message}")]
    Validation {
        /// Human-readable description.
        message: String,
        /// Offending field, when known.
        field: Option<String>,
    },

    /// The requested provider identifier is not one of the known providers.
    #[error("Unsupported provider: {provider}")]
    UnsupportedProvider {
        /// The identifier as sent by the caller.
        provider: String,
    },

    /// Neither the caller nor the process configuration supplied a key.
    #[error("{provider} API key not provided")]
    NoCredential {
        /// Provider the key was needed for.
        provider: ProviderKind,
    },

    /// The upstream rejected the credential.
    #[error("{provider} authentication failed: {message}")]
    UpstreamAuth {
        /// Upstream provider.
        provider: ProviderKind,
        /// Upstream error message.
        message: String,
    },

    /// The upstream answered with a non-success status or an undecodable stream.
    #[error("{provider} API error: {message}")]
    UpstreamProtocol {
        /// Upstream provider.
        provider: ProviderKind,
        /// Upstream error message.
        message: String,
        /// Upstream HTTP status, when one was received.
        status: Option<u16>,
    },

    /// The upstream could not be reached or the connection dropped.
    #[error("{provider} unavailable: {message}")]
    UpstreamUnavailable {
        /// Upstream provider.
        provider: ProviderKind,
        /// Transport error description.
        message: String,
    },

    /// No authenticated user could be identified.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Human-readable description.
        message: String,
    },

    /// The identified user is not allowed to use the gateway.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Human-readable description.
        message: String,
    },

    /// Invalid gateway configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human-readable description.
        message: String,
    },

    /// Unexpected internal failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable description.
        message: String,
    },
}

impl GatewayError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Validation {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    /// Create an unsupported provider error.
    pub fn unsupported_provider(provider: impl Into<String>) -> Self {
        Self::UnsupportedProvider {
            provider: provider.into(),
        }
    }

    /// Create a missing credential error.
    #[must_use]
    pub fn no_credential(provider: ProviderKind) -> Self {
        Self::NoCredential { provider }
    }

    /// Create an upstream authentication error.
    pub fn upstream_auth(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::UpstreamAuth {
            provider,
            message: message.into(),
        }
    }

    /// Create an upstream protocol error.
    pub fn upstream_protocol(
        provider: ProviderKind,
        message: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        Self::UpstreamProtocol {
            provider,
            message: message.into(),
            status,
        }
    }

    /// Create an upstream unavailable error.
    pub fn upstream_unavailable(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            provider,
            message: message.into(),
        }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code this error is reported with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::UnsupportedProvider { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::UpstreamAuth { .. } | Self::UpstreamProtocol { .. } => 502,
            Self::UpstreamUnavailable { .. } => 503,
            Self::NoCredential { .. } | Self::Configuration { .. } | Self::Internal { .. } => 500,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "invalid_request",
            Self::UnsupportedProvider { .. } => "unsupported_provider",
            Self::NoCredential { .. } => "no_credential",
            Self::UpstreamAuth { .. } => "upstream_auth_error",
            Self::UpstreamProtocol { .. } => "upstream_protocol_error",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::Configuration { .. } | Self::Internal { .. } => "internal_error",
        }
    }

    /// Whether the error originated at an upstream provider.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamAuth { .. } | Self::UpstreamProtocol { .. } | Self::UpstreamUnavailable { .. }
        )
    }
}
