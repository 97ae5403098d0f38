//! Integration tests for WebSocket connection and messaging.

mod helpers;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use aangan_core::config::RealtimeConfig;
use aangan_core::events::Whisper;
use helpers::{TestApp, WsClient, eventually};

#[tokio::test]
async fn test_ws_route_requires_upgrade() {
    let app = TestApp::new();

    let response = app.request("GET", "/ws", None, &[]).await;

    assert!(
        response.status.is_client_error(),
        "Expected a 4xx for a plain GET, got {}",
        response.status
    );
}

#[tokio::test]
async fn test_welcome_subscribe_and_live_whisper() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let mut client = WsClient::connect(addr).await;

    let welcome = client.recv_json().await;
    assert_eq!(welcome["type"], "welcome");
    assert!(welcome["session_id"].is_string());

    client
        .send_json(json!({"type": "subscribe", "channel": "tapri"}))
        .await;
    let ack = client.recv_json().await;
    assert_eq!(ack, json!({"type": "subscribed", "channel": "tapri", "replayed": 0}));

    app.realtime
        .bridge
        .notify_whisper_created(Whisper::new(1, "hi", "joy", "tapri"))
        .unwrap();

    let frame = client.recv_json().await;
    assert_eq!(frame["type"], "whisper");
    assert_eq!(frame["channel"], "tapri");
    assert_eq!(frame["whisper"]["content"], "hi");

    // Only the zone subscription exists; the feed copy is not delivered.
    assert!(client.expect_silence(Duration::from_millis(200)).await);
}

#[tokio::test]
async fn test_late_joiner_gets_replay_then_live() {
    let app = TestApp::new();
    for i in 1..=2i64 {
        app.realtime
            .bridge
            .notify_whisper_created(Whisper::new(i, format!("m{i}"), "joy", "library"))
            .unwrap();
    }

    let addr = app.spawn().await;
    let mut client = WsClient::connect(addr).await;
    client.recv_json().await;

    client
        .send_json(json!({"type": "subscribe", "channel": "__feed__"}))
        .await;

    let first = client.recv_json().await;
    let second = client.recv_json().await;
    assert_eq!(first["whisper"]["content"], "m1");
    assert_eq!(second["whisper"]["content"], "m2");

    let ack = client.recv_json().await;
    assert_eq!(ack["type"], "subscribed");
    assert_eq!(ack["replayed"], 2);

    app.realtime
        .bridge
        .notify_whisper_created(Whisper::new(3, "m3", "joy", "library"))
        .unwrap();
    let live = client.recv_json().await;
    assert_eq!(live["whisper"]["content"], "m3");
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let mut client = WsClient::connect(addr).await;
    client.recv_json().await;

    client
        .send_json(json!({"type": "subscribe", "channel": "tapri"}))
        .await;
    client.recv_json().await;
    client
        .send_json(json!({"type": "unsubscribe", "channel": "tapri"}))
        .await;
    let ack = client.recv_json().await;
    assert_eq!(ack, json!({"type": "unsubscribed", "channel": "tapri"}));

    app.realtime
        .bridge
        .notify_whisper_created(Whisper::new(2, "gone", "sad", "tapri"))
        .unwrap();
    assert!(client.expect_silence(Duration::from_millis(200)).await);
}

#[tokio::test]
async fn test_disconnect_cleans_up_subscriptions() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let mut client = WsClient::connect(addr).await;
    client.recv_json().await;

    for channel in ["tapri", "library", "__feed__"] {
        client
            .send_json(json!({"type": "subscribe", "channel": channel}))
            .await;
        client.recv_json().await;
    }
    assert_eq!(app.realtime.pubsub.total_subscriptions(), 3);

    client.close().await;

    let pubsub = &app.realtime.pubsub;
    assert!(eventually(|| pubsub.total_subscriptions() == 0).await);
    assert!(eventually(|| app.realtime.sessions.session_count() == 0).await);
    assert_eq!(app.realtime.transport.connection_count(), 0);
}

#[tokio::test]
async fn test_protocol_errors_keep_connection_open() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let mut client = WsClient::connect(addr).await;
    client.recv_json().await;

    client.send_text("not json").await;
    let err = client.recv_json().await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "INVALID_MESSAGE");

    client
        .send_json(json!({"type": "subscribe", "channel": "no spaces allowed"}))
        .await;
    let err = client.recv_json().await;
    assert_eq!(err["code"], "INVALID_CHANNEL");

    client
        .send_json(json!({
            "type": "publish",
            "channel": "tapri",
            "whisper": {"id": 1, "content": "x", "emotion": "joy", "zone": "tapri"}
        }))
        .await;
    let err = client.recv_json().await;
    assert_eq!(err["code"], "FORBIDDEN");

    client
        .send_json(json!({"type": "subscribe", "channel": "tapri"}))
        .await;
    assert_eq!(client.recv_json().await["type"], "subscribed");
}

#[tokio::test]
async fn test_subscription_limit_rejects_without_closing() {
    let app = TestApp::with_realtime(RealtimeConfig {
        max_subscriptions_per_session: 1,
        ..RealtimeConfig::default()
    });
    let addr = app.spawn().await;
    let mut client = WsClient::connect(addr).await;
    client.recv_json().await;

    client
        .send_json(json!({"type": "subscribe", "channel": "tapri"}))
        .await;
    client.recv_json().await;
    client
        .send_json(json!({"type": "subscribe", "channel": "library"}))
        .await;
    let err = client.recv_json().await;
    assert_eq!(err["code"], "MAX_SUBSCRIPTIONS");

    client
        .send_json(json!({"type": "unsubscribe", "channel": "tapri"}))
        .await;
    assert_eq!(client.recv_json().await["type"], "unsubscribed");
}

#[tokio::test]
async fn test_engine_shutdown_closes_sockets() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let mut client = WsClient::connect(addr).await;
    client.recv_json().await;
    client
        .send_json(json!({"type": "subscribe", "channel": "tapri"}))
        .await;
    client.recv_json().await;

    assert_eq!(app.realtime.shutdown(), 1);

    assert!(client.expect_closed(Duration::from_secs(5)).await);
    assert_eq!(app.realtime.pubsub.total_subscriptions(), 0);
    assert_eq!(app.realtime.sessions.session_count(), 0);
}
