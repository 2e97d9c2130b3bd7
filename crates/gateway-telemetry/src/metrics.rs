//! Prometheus metrics.
//!
//! Labels never carry credentials or message text; provider labels use the
//! wire identifiers.

use crate::error::TelemetryError;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Gateway metrics, registered on a private registry.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    /// Streams by provider and outcome (`completed`, `truncated`, `cancelled`, `rejected`)
    pub requests_total: IntCounterVec,
    /// Fragments forwarded to callers
    pub fragments_total: IntCounterVec,
    /// Time from stream open to close
    pub stream_duration: HistogramVec,
    /// Time from stream open to first fragment
    pub first_fragment: HistogramVec,
    /// Requests rejected before streaming, by error code
    pub rejections_total: IntCounterVec,
}

impl Metrics {
    /// Create and register all metrics
    ///
    /// # Errors
    /// Returns error if a metric cannot be created or registered
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("chat_stream_requests_total", "Chat streams by provider and outcome"),
            &["provider", "outcome"],
        )?;
        let fragments_total = IntCounterVec::new(
            Opts::new("chat_stream_fragments_total", "Delta fragments forwarded to callers"),
            &["provider"],
        )?;
        let stream_duration = HistogramVec::new(
            HistogramOpts::new("chat_stream_duration_seconds", "Chat stream duration")
                .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["provider"],
        )?;
        let first_fragment = HistogramVec::new(
            HistogramOpts::new(
                "chat_stream_first_fragment_seconds",
                "Time until the first fragment of a chat stream",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["provider"],
        )?;
        let rejections_total = IntCounterVec::new(
            Opts::new("chat_stream_rejections_total", "Requests rejected before streaming"),
            &["code"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(fragments_total.clone()))?;
        registry.register(Box::new(stream_duration.clone()))?;
        registry.register(Box::new(first_fragment.clone()))?;
        registry.register(Box::new(rejections_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            fragments_total,
            stream_duration,
            first_fragment,
            rejections_total,
        })
    }

    /// Render all metrics in the Prometheus text format
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn gather(&self) -> Result<String, TelemetryError> {
        let families = self.registry.gather();
        Ok(TextEncoder::new().encode_to_string(&families)?)
    }
}
