//! Route definitions for the gateway API.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        // Metrics endpoint
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/api", api_routes())
        // Apply middleware
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::cors_layer())
        .with_state(state)
}

/// Chat and preference routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/stream", post(handlers::chat_stream))
        .route("/chat", post(handlers::chat))
        .route(
            "/user/preferences",
            get(handlers::get_preferences).post(handlers::save_preferences),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use gateway_config::GatewayConfig;
    use gateway_telemetry::Telemetry;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        AppState::builder()
            .config(GatewayConfig::default())
            .telemetry(Telemetry::new().unwrap())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn test_request_id_echoed() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_request_id_generated() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
