//! End-to-end tests for the chat stream gateway.
//!
//! These drive the full router with recording test-double adapters and, for
//! one provider, a real adapter pointed at a mock upstream.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures::stream;
use gateway_config::GatewayConfig;
use gateway_core::{
    Credential, CredentialResolver, DeltaEvent, DeltaStream, GatewayError, ProviderAdapter,
    ProviderKind,
};
use gateway_providers::{AdapterConfig, AdapterRegistry, OpenAiAdapter};
use gateway_server::{create_router, AppState};
use gateway_telemetry::Telemetry;
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use wiremock::matchers::{header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Adapter that records what it was called with and replays a script.
struct RecordingAdapter {
    kind: ProviderKind,
    open_error: Option<GatewayError>,
    items: Vec<Result<DeltaEvent, GatewayError>>,
    calls: AtomicUsize,
    keys: Mutex<Vec<String>>,
    messages: Mutex<Vec<String>>,
}

impl RecordingAdapter {
    fn new(kind: ProviderKind, items: Vec<Result<DeltaEvent, GatewayError>>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            open_error: None,
            items,
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        })
    }

    fn failing(kind: ProviderKind, error: GatewayError) -> Arc<Self> {
        Arc::new(Self {
            kind,
            open_error: Some(error),
            items: Vec::new(),
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for RecordingAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        "test-model"
    }

    async fn open_stream(
        &self,
        message: &str,
        credential: &Credential,
    ) -> Result<DeltaStream, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().unwrap().push(credential.expose().to_string());
        self.messages.lock().unwrap().push(message.to_string());

        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }
        Ok(Box::pin(stream::iter(self.items.clone())))
    }
}

fn fragments(parts: &[&str]) -> Vec<Result<DeltaEvent, GatewayError>> {
    parts.iter().map(|p| Ok(DeltaEvent::new(*p))).collect()
}

fn configured_keys() -> CredentialResolver {
    CredentialResolver::new()
        .with_default(ProviderKind::ChatGpt, SecretString::new("sk-configured".to_string()))
        .with_default(ProviderKind::Claude, SecretString::new("sk-ant-configured".to_string()))
}

fn app_with(adapter: Arc<RecordingAdapter>) -> Router {
    app_with_config(adapter, GatewayConfig::default())
}

fn app_with_config(adapter: Arc<RecordingAdapter>, config: GatewayConfig) -> Router {
    let state = AppState::builder()
        .config(config)
        .registry(AdapterRegistry::new().with_adapter(adapter))
        .resolver(configured_keys())
        .telemetry(Telemetry::new().unwrap())
        .build()
        .unwrap();
    create_router(state)
}

fn chat_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Concatenate the `content` of every record in a streamed body.
fn reassemble(body: &str) -> String {
    body.split("\n\n")
        .filter_map(|record| record.strip_prefix("data: "))
        .filter(|data| *data != "[DONE]")
        .map(|data| {
            let value: Value = serde_json::from_str(data).unwrap();
            value["content"].as_str().unwrap().to_string()
        })
        .collect()
}

mod chat_stream_tests {
    use super::*;

    #[tokio::test]
    async fn test_streams_fragments_in_order() {
        let adapter = RecordingAdapter::new(ProviderKind::ChatGpt, fragments(&["Hel", "lo", ", ", "world"]));
        let app = app_with(adapter.clone());

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Say hello", "provider": "chatgpt"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers["x-accel-buffering"], "no");

        let body = body_text(response).await;
        assert_eq!(reassemble(&body), "Hello, world");
        assert!(body.ends_with("data: [DONE]\n\n"));
        assert_eq!(adapter.messages.lock().unwrap().as_slice(), ["Say hello"]);
    }

    #[tokio::test]
    async fn test_embedded_newlines_stay_in_one_record() {
        let adapter = RecordingAdapter::new(ProviderKind::ChatGpt, fragments(&["line one\n\nline two"]));
        let app = app_with(adapter);

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Two lines", "provider": "chatgpt"}),
            ))
            .await
            .unwrap();

        let body = body_text(response).await;
        assert_eq!(
            body,
            "data: {\"content\":\"line one\\n\\nline two\"}\n\ndata: [DONE]\n\n"
        );
    }

    #[tokio::test]
    async fn test_empty_message_rejected_without_upstream_call() {
        let adapter = RecordingAdapter::new(ProviderKind::ChatGpt, fragments(&["never"]));
        let app = app_with(adapter.clone());

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "", "provider": "chatgpt"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "invalid_request");
        assert_eq!(json["error"], "Missing message or provider");
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_provider_rejected() {
        let adapter = RecordingAdapter::new(ProviderKind::ChatGpt, fragments(&["never"]));
        let app = app_with(adapter.clone());

        let response = app
            .oneshot(chat_request("/api/chat/stream", json!({"message": "Hi"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "invalid_request");
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let adapter = RecordingAdapter::new(ProviderKind::ChatGpt, fragments(&["never"]));
        let app = app_with(adapter.clone());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/chat/stream")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"message\":"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "invalid_request");
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_provider_never_defaults() {
        let adapter = RecordingAdapter::new(ProviderKind::ChatGpt, fragments(&["never"]));
        let app = app_with(adapter.clone());

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "llama"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "unsupported_provider");
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_known_provider_without_adapter() {
        let adapter = RecordingAdapter::new(ProviderKind::ChatGpt, fragments(&["never"]));
        let app = app_with(adapter.clone());

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "gemini"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "unsupported_provider");
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_caller_key_beats_configured_key() {
        let adapter = RecordingAdapter::new(ProviderKind::ChatGpt, fragments(&["ok"]));
        let app = app_with(adapter.clone());

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "chatgpt", "apiKey": "sk-caller"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let _ = body_text(response).await;

        assert_eq!(adapter.keys.lock().unwrap().as_slice(), ["sk-caller"]);
    }

    #[tokio::test]
    async fn test_configured_key_used_when_caller_sends_none() {
        let adapter = RecordingAdapter::new(ProviderKind::Claude, fragments(&["ok"]));
        let app = app_with(adapter.clone());

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "claude", "apiKey": ""}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let _ = body_text(response).await;

        assert_eq!(adapter.keys.lock().unwrap().as_slice(), ["sk-ant-configured"]);
    }

    #[tokio::test]
    async fn test_missing_credential_is_server_error() {
        let adapter = RecordingAdapter::new(ProviderKind::Perplexity, fragments(&["never"]));
        let app = app_with(adapter.clone());

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "perplexity"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["code"], "no_credential");
        assert_eq!(json["error"], "Perplexity API key not provided");
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_auth_failure_before_streaming() {
        let adapter = RecordingAdapter::failing(
            ProviderKind::ChatGpt,
            GatewayError::upstream_auth(ProviderKind::ChatGpt, "HTTP 401: Incorrect API key provided"),
        );
        let app = app_with(adapter.clone());

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "chatgpt", "apiKey": "sk-wrong"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let json = body_json(response).await;
        assert_eq!(json["code"], "upstream_auth_error");
        assert!(!json["error"].as_str().unwrap().contains("sk-wrong"));
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_first_item_failure_is_json_error() {
        let adapter = RecordingAdapter::new(
            ProviderKind::Claude,
            vec![Err(GatewayError::upstream_unavailable(ProviderKind::Claude, "Overloaded"))],
        );
        let app = app_with(adapter);

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "claude"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["code"], "upstream_unavailable");
    }

    #[tokio::test]
    async fn test_mid_stream_failure_truncates_without_marker() {
        let adapter = RecordingAdapter::new(
            ProviderKind::ChatGpt,
            vec![
                Ok(DeltaEvent::new("Partial ")),
                Ok(DeltaEvent::new("answer")),
                Err(GatewayError::upstream_unavailable(ProviderKind::ChatGpt, "connection reset")),
                Ok(DeltaEvent::new("never sent")),
            ],
        );
        let app = app_with(adapter.clone());

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "chatgpt"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert_eq!(reassemble(&body), "Partial answer");
        assert!(!body.contains("[DONE]"));
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_completion_marker_disabled() {
        let mut config = GatewayConfig::default();
        config.stream.completion_marker = false;
        let adapter = RecordingAdapter::new(ProviderKind::ChatGpt, fragments(&["Hi"]));
        let app = app_with_config(adapter, config);

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "chatgpt"}),
            ))
            .await
            .unwrap();

        assert_eq!(body_text(response).await, "data: {\"content\":\"Hi\"}\n\n");
    }

    #[tokio::test]
    async fn test_empty_upstream_only_sends_marker() {
        let adapter = RecordingAdapter::new(ProviderKind::ChatGpt, Vec::new());
        let app = app_with(adapter);

        let response = app
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "chatgpt"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "data: [DONE]\n\n");
    }
}

mod chat_tests {
    use super::*;

    #[tokio::test]
    async fn test_non_streaming_chat() {
        let adapter = RecordingAdapter::new(ProviderKind::Claude, fragments(&["Bon", "jour"]));
        let app = app_with(adapter);

        let response = app
            .oneshot(chat_request(
                "/api/chat",
                json!({"message": "Hello in French", "provider": "claude"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["content"], "Bonjour");
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["provider"], "claude");
    }

    #[tokio::test]
    async fn test_non_streaming_mid_stream_failure_is_error() {
        let adapter = RecordingAdapter::new(
            ProviderKind::Claude,
            vec![
                Ok(DeltaEvent::new("Bon")),
                Err(GatewayError::upstream_protocol(ProviderKind::Claude, "overloaded", None)),
            ],
        );
        let app = app_with(adapter);

        let response = app
            .oneshot(chat_request(
                "/api/chat",
                json!({"message": "Hello", "provider": "claude"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["code"], "upstream_protocol_error");
    }
}

mod preferences_tests {
    use super::*;

    fn app_with_domains(domains: &[&str]) -> Router {
        let mut config = GatewayConfig::default();
        config.auth.allowed_domains = domains.iter().map(|d| (*d).to_string()).collect();
        app_with_config(RecordingAdapter::new(ProviderKind::ChatGpt, Vec::new()), config)
    }

    fn preferences_request(method: Method, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri("/api/user/preferences")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-email", user);
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        builder.body(body).unwrap()
    }

    #[tokio::test]
    async fn test_requires_session() {
        let app = app_with_domains(&[]);

        let response = app
            .oneshot(preferences_request(Method::GET, None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "unauthorized");
    }

    #[tokio::test]
    async fn test_domain_not_allowed() {
        let app = app_with_domains(&["example.com"]);

        let response = app
            .oneshot(preferences_request(Method::GET, Some("eve@evil.test"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["code"], "forbidden");
    }

    #[tokio::test]
    async fn test_defaults_when_nothing_saved() {
        let app = app_with_domains(&["example.com"]);

        let response = app
            .oneshot(preferences_request(Method::GET, Some("ada@example.com"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["mode"], "auto");
        assert_eq!(json["selectedLLM"], Value::Null);
        assert_eq!(json["openaiApiKey"], "");
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let app = app_with_domains(&[]);

        let saved = app
            .clone()
            .oneshot(preferences_request(
                Method::POST,
                Some("ada@example.com"),
                Some(json!({"mode": "manual", "selectedLLM": "gemini", "geminiApiKey": "g-key"})),
            ))
            .await
            .unwrap();
        assert_eq!(saved.status(), StatusCode::OK);
        let saved = body_json(saved).await;
        assert_eq!(saved["selectedLLM"], "gemini");
        assert!(saved["updatedAt"].is_string());

        let loaded = app
            .clone()
            .oneshot(preferences_request(Method::GET, Some("ada@example.com"), None))
            .await
            .unwrap();
        assert_eq!(body_json(loaded).await, saved);

        let other = app
            .oneshot(preferences_request(Method::GET, Some("bob@example.com"), None))
            .await
            .unwrap();
        assert_eq!(body_json(other).await["mode"], "auto");
    }
}

mod operational_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let app = app_with(RecordingAdapter::new(ProviderKind::ChatGpt, Vec::new()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_with_adapter() {
        let app = app_with(RecordingAdapter::new(ProviderKind::ChatGpt, Vec::new()));

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_record_streams_and_rejections() {
        let app = app_with(RecordingAdapter::new(ProviderKind::ChatGpt, fragments(&["a", "b"])));

        let response = app
            .clone()
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "chatgpt"}),
            ))
            .await
            .unwrap();
        let _ = body_text(response).await;

        let response = app
            .clone()
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "gemini"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let text = body_text(response).await;

        assert!(text.contains("chat_stream_requests_total{outcome=\"completed\",provider=\"chatgpt\"} 1"));
        assert!(text.contains("chat_stream_fragments_total{provider=\"chatgpt\"} 2"));
        assert!(text.contains("chat_stream_rejections_total{code=\"unsupported_provider\"} 1"));
    }
}

mod upstream_tests {
    use super::*;

    #[tokio::test]
    async fn test_openai_stream_through_gateway() {
        let server = MockServer::start().await;
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header_matcher("authorization", "Bearer sk-caller"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = OpenAiAdapter::new(
            AdapterConfig::for_provider(ProviderKind::ChatGpt).with_base_url(server.uri()),
        )
        .unwrap();
        let state = AppState::builder()
            .registry(AdapterRegistry::new().with_adapter(Arc::new(adapter)))
            .resolver(CredentialResolver::new())
            .build()
            .unwrap();

        let response = create_router(state)
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "chatgpt", "apiKey": "sk-caller"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert_eq!(reassemble(&body), "Hello there");
        assert!(body.ends_with("data: [DONE]\n\n"));
    }

    #[tokio::test]
    async fn test_openai_close_before_done_has_no_marker() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "data: {\"choices\":[{\"delta\":{\"content\":\"Half an\"}}]}\n\n",
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        let adapter = OpenAiAdapter::new(
            AdapterConfig::for_provider(ProviderKind::ChatGpt).with_base_url(server.uri()),
        )
        .unwrap();
        let state = AppState::builder()
            .registry(AdapterRegistry::new().with_adapter(Arc::new(adapter)))
            .resolver(configured_keys())
            .build()
            .unwrap();

        let response = create_router(state)
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "chatgpt"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "data: {\"content\":\"Half an\"}\n\n");
    }

    #[tokio::test]
    async fn test_openai_rejects_key_before_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let adapter = OpenAiAdapter::new(
            AdapterConfig::for_provider(ProviderKind::ChatGpt).with_base_url(server.uri()),
        )
        .unwrap();
        let state = AppState::builder()
            .registry(AdapterRegistry::new().with_adapter(Arc::new(adapter)))
            .resolver(configured_keys())
            .build()
            .unwrap();

        let response = create_router(state)
            .oneshot(chat_request(
                "/api/chat/stream",
                json!({"message": "Hi", "provider": "chatgpt"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["code"], "upstream_auth_error");
        assert!(json["error"].as_str().unwrap().contains("Incorrect API key provided"));
    }
}
