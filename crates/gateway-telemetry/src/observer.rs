//! Stream lifecycle observation.
//!
//! The request path reports to an injected [`StreamObserver`] instead of
//! logging inline. Observers see provider identifiers, outcomes, counts and
//! error descriptions only; they never receive credentials or message text.

use crate::error::TelemetryError;
use crate::metrics::Metrics;
use gateway_core::{CredentialSource, GatewayError, ProviderKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The upstream finished normally.
    Completed,
    /// The upstream failed after streaming had started.
    Truncated,
    /// The caller went away before the stream finished.
    Cancelled,
}

impl StreamOutcome {
    /// Metric label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Truncated => "truncated",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Final account of one stream, reported exactly once.
#[derive(Debug, Clone)]
pub struct StreamSummary {
    /// Provider that served the stream
    pub provider: ProviderKind,
    /// How it ended
    pub outcome: StreamOutcome,
    /// Fragments forwarded
    pub fragments: u64,
    /// Outbound bytes written
    pub bytes: u64,
    /// Time from open to close
    pub duration: Duration,
    /// Time from open to first fragment
    pub first_fragment: Option<Duration>,
    /// Failure that truncated the stream
    pub error: Option<GatewayError>,
}

/// Sink for stream lifecycle events.
pub trait StreamObserver: Send + Sync {
    /// A request failed before any byte was streamed.
    fn request_rejected(&self, provider: Option<ProviderKind>, error: &GatewayError);

    /// An upstream stream was opened and its first item arrived.
    fn stream_opened(&self, provider: ProviderKind, source: CredentialSource);

    /// A stream finished, failed or was dropped.
    fn stream_closed(&self, summary: &StreamSummary);
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StreamObserver for NoopObserver {
    fn request_rejected(&self, _provider: Option<ProviderKind>, _error: &GatewayError) {}

    fn stream_opened(&self, _provider: ProviderKind, _source: CredentialSource) {}

    fn stream_closed(&self, _summary: &StreamSummary) {}
}

/// Observer that logs with `tracing` and records Prometheus metrics.
#[derive(Debug, Clone)]
pub struct Telemetry {
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// Create telemetry with a fresh metrics registry
    ///
    /// # Errors
    /// Returns error if metrics cannot be registered
    pub fn new() -> Result<Self, TelemetryError> {
        Ok(Self {
            metrics: Arc::new(Metrics::new()?),
        })
    }

    /// Metrics backing this observer
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl StreamObserver for Telemetry {
    fn request_rejected(&self, provider: Option<ProviderKind>, error: &GatewayError) {
        let code = error.error_code();
        let provider_label = provider.map_or("none", ProviderKind::as_str);

        self.metrics.rejections_total.with_label_values(&[code]).inc();
        if let Some(provider) = provider {
            self.metrics
                .requests_total
                .with_label_values(&[provider.as_str(), "rejected"])
                .inc();
        }

        if error.is_upstream() || error.status_code() >= 500 {
            warn!(provider = provider_label, code, error = %error, "Request failed before streaming");
        } else {
            info!(provider = provider_label, code, error = %error, "Request rejected");
        }
    }

    fn stream_opened(&self, provider: ProviderKind, source: CredentialSource) {
        info!(
            provider = provider.as_str(),
            credential = source.as_str(),
            "Stream opened"
        );
    }

    fn stream_closed(&self, summary: &StreamSummary) {
        let provider = summary.provider.as_str();

        self.metrics
            .requests_total
            .with_label_values(&[provider, summary.outcome.as_str()])
            .inc();
        self.metrics
            .fragments_total
            .with_label_values(&[provider])
            .inc_by(summary.fragments);
        self.metrics
            .stream_duration
            .with_label_values(&[provider])
            .observe(summary.duration.as_secs_f64());
        if let Some(first) = summary.first_fragment {
            self.metrics
                .first_fragment
                .with_label_values(&[provider])
                .observe(first.as_secs_f64());
        }

        let duration_ms = summary.duration.as_millis() as u64;
        match (&summary.outcome, &summary.error) {
            (StreamOutcome::Truncated, Some(error)) => warn!(
                provider,
                fragments = summary.fragments,
                bytes = summary.bytes,
                duration_ms,
                code = error.error_code(),
                error = %error,
                "Stream truncated by upstream failure"
            ),
            _ => info!(
                provider,
                outcome = summary.outcome.as_str(),
                fragments = summary.fragments,
                bytes = summary.bytes,
                duration_ms,
                "Stream closed"
            ),
        }
    }
}
