//! Outbound stream normalization.
//!
//! Turns an adapter's delta stream into the outbound record stream. Each
//! fragment is written as its own record as soon as it arrives. A clean end
//! is followed by the completion marker (when enabled); an upstream failure
//! ends the body without one. The observer hears about the close exactly
//! once, including when the caller disconnects and the body is dropped.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use gateway_core::{encode_delta, DeltaEvent, DeltaStream, GatewayError, ProviderKind, DONE_FRAME};
use gateway_telemetry::{StreamObserver, StreamOutcome, StreamSummary};

/// Reports the stream summary when dropped.
struct CloseReport {
    observer: Arc<dyn StreamObserver>,
    provider: ProviderKind,
    started: Instant,
    fragments: u64,
    bytes: u64,
    first_fragment: Option<Duration>,
    outcome: Option<StreamOutcome>,
    error: Option<GatewayError>,
}

impl CloseReport {
    fn new(observer: Arc<dyn StreamObserver>, provider: ProviderKind, started: Instant) -> Self {
        Self {
            observer,
            provider,
            started,
            fragments: 0,
            bytes: 0,
            first_fragment: None,
            outcome: None,
            error: None,
        }
    }

    fn fragment(&mut self, frame: &Bytes) {
        if self.first_fragment.is_none() {
            self.first_fragment = Some(self.started.elapsed());
        }
        self.fragments += 1;
        self.bytes += frame.len() as u64;
    }

    fn finish(&mut self, outcome: StreamOutcome, error: Option<GatewayError>) {
        self.outcome = Some(outcome);
        self.error = error;
    }
}

impl Drop for CloseReport {
    fn drop(&mut self) {
        let summary = StreamSummary {
            provider: self.provider,
            // Dropped before an outcome was recorded: the caller went away
            outcome: self.outcome.unwrap_or(StreamOutcome::Cancelled),
            fragments: self.fragments,
            bytes: self.bytes,
            duration: self.started.elapsed(),
            first_fragment: self.first_fragment,
            error: self.error.take(),
        };
        self.observer.stream_closed(&summary);
    }
}

/// Options for [`normalize`].
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Emit `data: [DONE]` after a clean end
    pub completion_marker: bool,
    /// When the upstream was opened
    pub started: Instant,
}

/// Build the outbound body stream.
///
/// `first` is the item already taken from `upstream` before headers were
/// committed; `None` means the upstream ended without producing anything.
pub fn normalize(
    provider: ProviderKind,
    first: Option<DeltaEvent>,
    upstream: DeltaStream,
    options: NormalizeOptions,
    observer: Arc<dyn StreamObserver>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    // Built outside the generator so a body dropped before its first poll
    // still reports
    let mut report = CloseReport::new(observer, provider, options.started);
    let mut upstream = upstream.fuse();
    let mut pending = first;

    stream! {
        loop {
            let next = match pending.take() {
                Some(event) => Some(Ok(event)),
                None => upstream.next().await,
            };

            match next {
                Some(Ok(event)) => {
                    let frame = encode_delta(&event);
                    report.fragment(&frame);
                    yield Ok(frame);
                }
                Some(Err(error)) => {
                    report.finish(StreamOutcome::Truncated, Some(error));
                    break;
                }
                None => {
                    report.finish(StreamOutcome::Completed, None);
                    if options.completion_marker {
                        report.bytes += DONE_FRAME.len() as u64;
                        yield Ok(Bytes::from_static(DONE_FRAME.as_bytes()));
                    }
                    break;
                }
            }
        }

        // Release the upstream connection before reporting
        drop(upstream);
        drop(report);
    }
}

/// Drain the upstream into one string.
///
/// Any failure, even after fragments were received, fails the whole call.
pub async fn collect_text(
    provider: ProviderKind,
    first: Option<DeltaEvent>,
    upstream: DeltaStream,
    started: Instant,
    observer: Arc<dyn StreamObserver>,
) -> Result<String, GatewayError> {
    let mut report = CloseReport::new(observer, provider, started);
    let mut upstream = upstream.fuse();
    let mut content = String::new();

    if let Some(event) = first {
        report.fragments += 1;
        report.first_fragment = Some(started.elapsed());
        content.push_str(&event.content);
    }

    while let Some(item) = upstream.next().await {
        match item {
            Ok(event) => {
                if report.first_fragment.is_none() {
                    report.first_fragment = Some(started.elapsed());
                }
                report.fragments += 1;
                content.push_str(&event.content);
            }
            Err(error) => {
                report.finish(StreamOutcome::Truncated, Some(error.clone()));
                return Err(error);
            }
        }
    }

    report.bytes = content.len() as u64;
    report.finish(StreamOutcome::Completed, None);
    Ok(content)
}
