//! Telemetry errors.

/// Telemetry initialization error
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The global subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    Init(String),

    /// A metric could not be created, registered or encoded
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
