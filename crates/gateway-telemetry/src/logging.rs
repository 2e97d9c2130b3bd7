//! Logging setup.

use crate::error::TelemetryError;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Service name reported at startup
    pub service_name: String,
    /// Default filter directive, used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit one JSON object per line instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            service_name: "chat-stream-gateway".to_string(),
            log_level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Switch JSON output on or off
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Filter from `RUST_LOG`, falling back to the configured level
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
/// Returns error if a global subscriber is already installed
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = config.filter();

    let layer = if config.json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer().with_target(true).with_filter(filter).boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    info!(
        service = %config.service_name,
        json = config.json,
        "Logging initialized"
    );

    Ok(())
}
