//! Server-sent event iteration shared by the SSE adapters.

use crate::error::event_source_error;
use async_stream::try_stream;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use gateway_core::{GatewayError, ProviderKind, DONE_SENTINEL};
use reqwest::RequestBuilder;
use reqwest_eventsource::{Event, EventSource};
use tracing::trace;

/// One deframed server-sent event.
#[derive(Debug, Clone)]
pub(crate) struct SseMessage {
    /// `event:` field, `message` when absent
    pub event: String,
    /// `data:` field
    pub data: String,
}

/// How an upstream marks a finished answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamEnd {
    /// A `data: [DONE]` event; a close before it is a truncated answer
    Sentinel,
    /// The connection closing
    Close,
}

/// Open an event source and yield its messages.
///
/// The connection is made on first poll. The sequence ends at a `[DONE]`
/// data field, or at the upstream's end of stream when `end` is
/// [`StreamEnd::Close`]. The event source is closed on the first error so it
/// never reconnects.
pub(crate) fn event_stream(
    provider: ProviderKind,
    request: RequestBuilder,
    end: StreamEnd,
) -> Result<BoxStream<'static, Result<SseMessage, GatewayError>>, GatewayError> {
    let mut source = EventSource::new(request)
        .map_err(|e| GatewayError::internal(format!("Failed to create event source: {e}")))?;

    let stream = try_stream! {
        let mut done = false;
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => {
                    trace!(provider = provider.as_str(), "Upstream stream opened");
                }
                Ok(Event::Message(message)) => {
                    if message.data.trim() == DONE_SENTINEL {
                        done = true;
                        break;
                    }
                    yield SseMessage {
                        event: message.event,
                        data: message.data,
                    };
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    source.close();
                    Err(event_source_error(provider, e).await)?;
                }
            }
        }
        source.close();

        if !done && end == StreamEnd::Sentinel {
            Err(GatewayError::upstream_protocol(
                provider,
                format!("stream ended before {DONE_SENTINEL}"),
                None,
            ))?;
        }
    };

    Ok(Box::pin(stream))
}
