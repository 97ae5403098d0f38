//! Integration tests for the HTTP surface: ingest hook, history, health.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use aangan_core::config::RealtimeConfig;

#[tokio::test]
async fn test_health_check() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health", None, &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "healthy");
    assert!(response.body["data"]["version"].is_string());
}

#[tokio::test]
async fn test_detailed_health_check() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health/detailed", None, &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["history_capacity"], 50);
    assert!(response.body["data"]["metrics"]["messages_published"].is_number());
}

#[tokio::test]
async fn test_ingest_publishes_to_zone_and_feed() {
    let app = helpers::TestApp::new();
    let whisper = json!({
        "id": "0b9d4c8e-1f2a-4c55-9a0e-7e1d2c3b4a59",
        "content": "anyone at the tapri?",
        "emotion": "curious",
        "zone": "tapri",
        "timestamp": "2026-10-19T08:30:00Z"
    });

    let response = app
        .request("POST", "/api/internal/whispers", Some(whisper), &[])
        .await;

    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body["data"]["channels"], json!(["tapri", "__feed__"]));
    assert_eq!(app.realtime.pubsub.history("tapri").len(), 1);
    assert_eq!(app.realtime.pubsub.history("__feed__").len(), 1);
    assert_eq!(app.realtime.metrics.snapshot().messages_published, 2);
}

#[tokio::test]
async fn test_ingest_requires_token_when_configured() {
    let app = helpers::TestApp::with_realtime(RealtimeConfig {
        ingest_token: Some("backend-secret".into()),
        ..RealtimeConfig::default()
    });
    let whisper = json!({"id": 7, "content": "quiet here", "emotion": "calm", "zone": "library"});

    let denied = app
        .request("POST", "/api/internal/whispers", Some(whisper.clone()), &[])
        .await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
    assert_eq!(denied.body["error"], "UNAUTHORIZED");
    assert!(app.realtime.pubsub.history("library").is_empty());

    let accepted = app
        .request(
            "POST",
            "/api/internal/whispers",
            Some(whisper),
            &[("x-aangan-ingest-token", "backend-secret")],
        )
        .await;
    assert_eq!(accepted.status, StatusCode::ACCEPTED);
    assert_eq!(app.realtime.pubsub.history("library").len(), 1);
}

#[tokio::test]
async fn test_invalid_zone_rejected() {
    let app = helpers::TestApp::new();
    let whisper = json!({"id": 8, "content": "sneaky", "emotion": "sly", "zone": "__feed__"});

    let response = app
        .request("POST", "/api/internal/whispers", Some(whisper), &[])
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");
    assert_eq!(app.realtime.pubsub.channel_count(), 0);
}

#[tokio::test]
async fn test_history_is_bounded_and_oldest_first() {
    let app = helpers::TestApp::with_realtime(RealtimeConfig {
        history_capacity: 3,
        ..RealtimeConfig::default()
    });

    for i in 1..=5 {
        let whisper = json!({"id": i, "content": format!("w{i}"), "emotion": "joy", "zone": "canteen"});
        let response = app
            .request("POST", "/api/internal/whispers", Some(whisper), &[])
            .await;
        assert_eq!(response.status, StatusCode::ACCEPTED);
    }

    let response = app
        .request("GET", "/api/channels/canteen/history", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let contents: Vec<&str> = response.body["data"]["whispers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["w3", "w4", "w5"]);
}

#[tokio::test]
async fn test_history_of_unknown_channel_is_empty() {
    let app = helpers::TestApp::new();

    let response = app
        .request("GET", "/api/channels/Hostel-B/history", None, &[])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["channel"], "hostel-b");
    assert_eq!(response.body["data"]["whispers"], json!([]));
}
