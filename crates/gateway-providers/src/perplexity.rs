//! Perplexity adapter.
//!
//! Perplexity's streaming body is read as raw bytes and reassembled locally:
//! chunks are appended to a per-stream [`LineBuffer`], complete lines are
//! matched against the `data: ` prefix and the trailing partial line waits
//! for the next chunk. Payloads use the OpenAI chunk shape.

use crate::config::AdapterConfig;
use crate::error::{response_error, transport_error};
use crate::openai::{ChatCompletionChunk, ChatCompletionRequest};
use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;
use gateway_core::{
    parse_data_line, Credential, DataLine, DeltaEvent, DeltaStream, GatewayError, LineBuffer,
    ProviderAdapter, ProviderKind, DONE_SENTINEL,
};
use reqwest::Client;
use std::fmt::Display;
use tracing::{debug, trace};

/// Perplexity adapter
pub struct PerplexityAdapter {
    config: AdapterConfig,
    client: Client,
}

impl PerplexityAdapter {
    /// Create a new Perplexity adapter
    ///
    /// # Errors
    /// Returns error if the settings are for another provider or the HTTP
    /// client cannot be created
    pub fn new(config: AdapterConfig) -> Result<Self, GatewayError> {
        config.ensure_kind(ProviderKind::Perplexity)?;
        let client = config.build_client()?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl ProviderAdapter for PerplexityAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Perplexity
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn open_stream(
        &self,
        message: &str,
        credential: &Credential,
    ) -> Result<DeltaStream, GatewayError> {
        let body = ChatCompletionRequest::new(&self.config, message);
        debug!(model = %self.config.model, "Opening Perplexity stream");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(ProviderKind::Perplexity, e))?;

        if !response.status().is_success() {
            return Err(response_error(ProviderKind::Perplexity, response).await);
        }

        Ok(Box::pin(decode_lines(response.bytes_stream())))
    }
}

/// Decode a raw Perplexity body into delta events.
///
/// - `data: [DONE]` ends the sequence at once; anything still buffered is
///   dropped.
/// - Payloads that are not valid chunk JSON are skipped.
/// - Lines without the `data: ` prefix are ignored.
/// - A body that ends before `[DONE]` is a truncated answer and ends the
///   sequence with `UpstreamProtocol`; a partial line left at that point is
///   discarded.
/// - A line longer than [`gateway_core::MAX_LINE_BYTES`] ends the sequence with
///   `UpstreamProtocol`.
/// - A read error ends the sequence with `UpstreamUnavailable`.
pub fn decode_lines<S, E>(body: S) -> impl Stream<Item = Result<DeltaEvent, GatewayError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    try_stream! {
        let mut body = Box::pin(body);
        let mut buffer = LineBuffer::new();
        let mut done = false;

        'read: while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                GatewayError::upstream_unavailable(
                    ProviderKind::Perplexity,
                    format!("stream read failed: {e}"),
                )
            })?;

            let lines = buffer.push(&chunk).map_err(|e| {
                GatewayError::upstream_protocol(ProviderKind::Perplexity, e.to_string(), None)
            })?;

            for line in lines {
                match parse_data_line(&line) {
                    Some(DataLine::Done) => {
                        buffer.clear();
                        done = true;
                        break 'read;
                    }
                    Some(DataLine::Payload(payload)) => {
                        match serde_json::from_str::<ChatCompletionChunk>(payload) {
                            Ok(parsed) => {
                                if let Some(content) = parsed.into_content() {
                                    yield DeltaEvent::new(content);
                                }
                            }
                            Err(e) => {
                                debug!(error = %e, "Skipping unparseable Perplexity line");
                            }
                        }
                    }
                    None => {}
                }
            }
        }

        if !buffer.pending().is_empty() {
            trace!(bytes = buffer.pending().len(), "Discarding unterminated trailing line");
        }

        if !done {
            Err(GatewayError::upstream_protocol(
                ProviderKind::Perplexity,
                format!("stream ended before {DONE_SENTINEL}"),
                None,
            ))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use futures_util::TryStreamExt;
    use gateway_core::{CredentialSource, MAX_LINE_BYTES};
    use secrecy::SecretString;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, String>> + Send {
        let items: Vec<Result<Bytes, String>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        stream::iter(items)
    }

    async fn collect(parts: &[&'static [u8]]) -> Vec<String> {
        decode_lines(chunks(parts))
            .map_ok(|event| event.content)
            .try_collect()
            .await
            .unwrap()
    }

    /// Fragments decoded before the sequence failed, plus the failure.
    async fn collect_until_error(parts: &[&'static [u8]]) -> (Vec<String>, GatewayError) {
        let mut decoded = Box::pin(decode_lines(chunks(parts)));
        let mut contents = Vec::new();
        loop {
            match decoded.next().await.expect("sequence ended without an error") {
                Ok(event) => contents.push(event.content),
                Err(e) => {
                    assert!(decoded.next().await.is_none());
                    return (contents, e);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_json_split_across_chunks() {
        let contents = collect(&[
            br#"data: {"choices":[{"delta":{"content":"Hel"#,
            b"lo\"}}]}\n\n",
            b"data: [DONE]\n\n",
        ])
        .await;
        assert_eq!(contents, vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_done_stops_with_more_buffered() {
        let contents = collect(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n\ndata: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"B\"}}]}\n\n",
        ])
        .await;
        assert_eq!(contents, vec!["A".to_string()]);
    }

    #[tokio::test]
    async fn test_done_stops_before_later_chunks() {
        let contents = collect(&[
            b"data: [DONE]\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
        ])
        .await;
        assert!(contents.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_line_skipped() {
        let contents = collect(&[
            b"data: not-json\n\n",
            b": keep-alive\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\r\n\r\n",
            b"data: [DONE]\r\n\r\n",
        ])
        .await;
        assert_eq!(contents, vec!["ok".to_string()]);
    }

    #[tokio::test]
    async fn test_close_before_done_is_truncated() {
        let (contents, err) = collect_until_error(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}",
        ])
        .await;

        // The unterminated second line is dropped, not decoded
        assert_eq!(contents, vec!["one".to_string()]);
        match err {
            GatewayError::UpstreamProtocol { message, .. } => assert!(message.contains("[DONE]")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_endless_line_fails() {
        static BLOCK: [u8; 64 * 1024] = [b'x'; 64 * 1024];
        let parts: Vec<&'static [u8]> = std::iter::once(&b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n"[..])
            .chain(std::iter::repeat(&BLOCK[..]).take(MAX_LINE_BYTES / BLOCK.len() + 1))
            .collect();

        let (contents, err) = collect_until_error(&parts).await;
        assert_eq!(contents, vec!["a".to_string()]);
        assert!(matches!(err, GatewayError::UpstreamProtocol { .. }));
    }

    #[tokio::test]
    async fn test_read_error_after_fragment() {
        let items: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n")),
        ];
        let mut decoded = Box::pin(decode_lines(stream::iter(items)));

        assert_eq!(decoded.next().await.unwrap().unwrap(), DeltaEvent::new("Hi"));
        assert!(matches!(
            decoded.next().await.unwrap(),
            Err(GatewayError::UpstreamUnavailable { .. })
        ));
        assert!(decoded.next().await.is_none());
    }

    #[tokio::test]
    async fn test_upstream_request() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"id\":\"p1\",\"model\":\"llama-3.1-sonar-small-128k-online\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Par\"}}]}\n\n",
            "data: {\"id\":\"p1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"is\"}}]}\n\n",
            "data: [DONE]\n\n",
        );

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer pplx-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama-3.1-sonar-small-128k-online",
                "stream": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = PerplexityAdapter::new(
            AdapterConfig::for_provider(ProviderKind::Perplexity).with_base_url(server.uri()),
        )
        .unwrap();
        let credential = Credential::new(
            ProviderKind::Perplexity,
            SecretString::new("pplx-key".to_string()),
            CredentialSource::Configured,
        );

        let events: Vec<DeltaEvent> = adapter
            .open_stream("Capital of France?", &credential)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(events, vec![DeltaEvent::new("Par"), DeltaEvent::new("is")]);
    }

    /// Serve one streamed response, writing `parts` with `gap` between them.
    async fn spaced_upstream(parts: &'static [&'static str], gap: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }

            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            for part in parts {
                tokio::time::sleep(gap).await;
                // The client may already have given up
                if socket.write_all(part.as_bytes()).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
            }
        });

        format!("http://{address}")
    }

    fn spaced_adapter(base_url: String, timeout: Duration) -> PerplexityAdapter {
        PerplexityAdapter::new(
            AdapterConfig::for_provider(ProviderKind::Perplexity)
                .with_base_url(base_url)
                .with_timeout(timeout),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_slow_answer_outlives_read_timeout() {
        static PARTS: [&str; 5] = [
            "data: {\"choices\":[{\"delta\":{\"content\":\"one \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"two \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"three \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"four\"}}]}\n\n",
            "data: [DONE]\n\n",
        ];
        let base_url = spaced_upstream(&PARTS, Duration::from_millis(150)).await;
        let adapter = spaced_adapter(base_url, Duration::from_millis(500));
        let credential = Credential::new(
            ProviderKind::Perplexity,
            SecretString::new("pplx-key".to_string()),
            CredentialSource::Configured,
        );

        // Five gaps of 150ms: longer in total than the timeout, never idle for it
        let events: Vec<DeltaEvent> = adapter
            .open_stream("Count", &credential)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let text: String = events.into_iter().map(|e| e.content).collect();
        assert_eq!(text, "one two three four");
    }

    #[tokio::test]
    async fn test_idle_upstream_times_out() {
        static PARTS: [&str; 2] = [
            "data: {\"choices\":[{\"delta\":{\"content\":\"early\"}}]}\n\n",
            "data: [DONE]\n\n",
        ];
        let base_url = spaced_upstream(&PARTS, Duration::from_millis(800)).await;
        let adapter = spaced_adapter(base_url, Duration::from_millis(200));
        let credential = Credential::new(
            ProviderKind::Perplexity,
            SecretString::new("pplx-key".to_string()),
            CredentialSource::Configured,
        );

        // Headers arrive at once; the body then stays silent past the timeout
        let result = adapter.open_stream("Hi", &credential).await;
        let err = match result {
            Ok(mut stream) => stream.next().await.unwrap().unwrap_err(),
            Err(e) => e,
        };
        assert!(matches!(err, GatewayError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_upstream_forbidden_fails_open() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let adapter = PerplexityAdapter::new(
            AdapterConfig::for_provider(ProviderKind::Perplexity).with_base_url(server.uri()),
        )
        .unwrap();
        let credential = Credential::new(
            ProviderKind::Perplexity,
            SecretString::new("bad".to_string()),
            CredentialSource::Caller,
        );

        let result = adapter.open_stream("Hi", &credential).await;
        assert!(matches!(result, Err(GatewayError::UpstreamAuth { .. })));
    }
}
