//! Route definitions for the HTTP surface.

use axum::Router;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// Builds the complete router with every route.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(health_routes())
        .merge(internal_routes())
        .merge(channel_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .with_state(state)
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/detailed", get(handlers::health::detailed_health))
}

/// Routes called by the CRUD backend, not by browsers.
fn internal_routes() -> Router<AppState> {
    Router::new().route(
        "/internal/whispers",
        post(handlers::whisper::whisper_created),
    )
}

fn channel_routes() -> Router<AppState> {
    Router::new().route(
        "/channels/{channel}/history",
        get(handlers::channel::channel_history),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use aangan_core::config::{AppConfig, RealtimeConfig};
    use aangan_realtime::server::RealtimeEngine;

    use super::*;

    fn state_with(realtime: RealtimeConfig) -> AppState {
        let config = AppConfig {
            realtime: realtime.clone(),
            ..AppConfig::default()
        };
        AppState::new(config, Arc::new(RealtimeEngine::new(realtime)))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_whisper(body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/internal/whispers")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("x-aangan-ingest-token", token);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_then_history() {
        let state = state_with(RealtimeConfig::default());
        let router = build_router(state);

        let whisper = json!({"id": 1, "content": "chai?", "emotion": "joy", "zone": "Tapri"});
        let (status, body) = send(router.clone(), post_whisper(whisper, None)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["data"]["channels"], json!(["tapri", "__feed__"]));

        let (status, body) = send(router.clone(), get("/api/channels/tapri/history")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["whispers"][0]["content"], "chai?");

        let (_, body) = send(router, get("/api/channels/__feed__/history")).await;
        assert_eq!(body["data"]["whispers"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_token_enforced() {
        let state = state_with(RealtimeConfig {
            ingest_token: Some("s3cret".into()),
            ..RealtimeConfig::default()
        });
        let router = build_router(state);
        let whisper = json!({"id": 2, "content": "hi", "emotion": "calm", "zone": "library"});

        let (status, body) = send(router.clone(), post_whisper(whisper.clone(), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHORIZED");

        let (status, _) = send(router.clone(), post_whisper(whisper.clone(), Some("nope"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(router, post_whisper(whisper, Some("s3cret"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_invalid_whisper_is_bad_request() {
        let router = build_router(state_with(RealtimeConfig::default()));
        let whisper = json!({"id": 3, "content": "", "emotion": "joy", "zone": "__feed__"});

        let (status, body) = send(router, post_whisper(whisper, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_body_gets_api_error_shape() {
        let router = build_router(state_with(RealtimeConfig::default()));

        let request = Request::builder()
            .method("POST")
            .uri("/api/internal/whispers")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(router.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert!(body["message"].is_string());

        let missing_zone = json!({"id": 4, "content": "hi", "emotion": "joy"});
        let (status, body) = send(router, post_whisper(missing_zone, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_history_unknown_and_invalid_channels() {
        let router = build_router(state_with(RealtimeConfig::default()));

        let (status, body) = send(router.clone(), get("/api/channels/canteen/history")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["whispers"], json!([]));

        let (status, _) = send(router.clone(), get("/api/channels/__secret__/history")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(router, get("/api/channels/tapri/history?limit=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_limit_keeps_newest() {
        let state = state_with(RealtimeConfig::default());
        for i in 0..5i64 {
            let whisper = aangan_core::events::Whisper::new(i, format!("w{i}"), "joy", "tapri");
            state.realtime.bridge.notify_whisper_created(whisper).unwrap();
        }
        let router = build_router(state);

        let (_, body) = send(router, get("/api/channels/tapri/history?limit=2")).await;
        let contents: Vec<&str> = body["data"]["whispers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, vec!["w3", "w4"]);
    }

    #[tokio::test]
    async fn test_detailed_health_reports_counts() {
        let state = state_with(RealtimeConfig::default());
        let (_handle, _rx) = state.realtime.transport.open();
        let router = build_router(state);

        let (status, body) = send(router, get("/api/health/detailed")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["connections"], 1);
        assert_eq!(body["data"]["sessions"], 1);
        assert_eq!(body["data"]["metrics"]["connections_opened"], 1);
    }
}
