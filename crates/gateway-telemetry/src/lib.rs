//! # Gateway Telemetry
//!
//! Observability for the chat stream gateway.
//!
//! This crate provides:
//! - Structured logging setup (pretty or JSON)
//! - Prometheus metrics for stream outcomes and latency
//! - The [`StreamObserver`] sink the stream path reports to

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;
pub mod observer;

// Re-export main types
pub use error::TelemetryError;
pub use logging::{init_logging, LoggingConfig};
pub use metrics::Metrics;
pub use observer::{NoopObserver, StreamObserver, StreamOutcome, StreamSummary, Telemetry};
