//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::rest::{broadcast, stats};
use super::websocket::{
    handler::{ws_channel_handler, ws_handler},
    state::AppState,
};

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket endpoints
        .route("/ws", get(ws_handler))
        .route("/ws/:channel", get(ws_channel_handler))
        // Health check
        .route("/health", get(health_check))
        // REST API endpoints
        .route("/api/broadcast", post(broadcast::broadcast_event))
        .route("/api/stats", get(stats::get_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::websocket::channel::Channel;
    use crate::api::websocket::manager::ConnectionManager;
    use crate::config::FeedConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tower::util::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let config = FeedConfig::default();
        let manager = Arc::new(ConnectionManager::from_config(&config));
        Arc::new(AppState::new(manager, &config))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_broadcast_endpoint_delivers_to_channel() {
        let state = test_state();
        let (tx, mut rx) = mpsc::channel(8);
        state.manager.connect(tx, Channel::Bids).await;
        rx.try_recv().unwrap();

        let app = create_router(Arc::clone(&state));
        let response = app
            .oneshot(post_json(
                "/api/broadcast",
                json!({
                    "channel": "bids",
                    "event": {
                        "type": "new_bid",
                        "requirement_number": "REQ-2024-001",
                        "county_name": "Bosque",
                        "material_name": "Caliche",
                        "quantity": 500,
                        "bid_count": 3
                    }
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let report = body_json(response).await;
        assert_eq!(report["delivered"], 1);
        assert_eq!(report["channel"], "bids");

        let msg: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(msg["type"], "new_bid");
        assert_eq!(msg["bid_count"], 3);
    }

    #[tokio::test]
    async fn test_broadcast_endpoint_rejects_malformed_body() {
        let app = create_router(test_state());
        let response = app
            .oneshot(post_json("/api/broadcast", json!({"event": {"type": "bogus"}})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_broadcast_endpoint_rejects_control_events() {
        let app = create_router(test_state());
        let response = app
            .oneshot(post_json("/api/broadcast", json!({"event": {"type": "pong"}})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let state = test_state();
        let (tx, _rx) = mpsc::channel(8);
        state.manager.connect(tx, Channel::Options).await;

        let app = create_router(Arc::clone(&state));
        let response = app
            .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let stats = body_json(response).await;
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["options"], 1);
    }
}
