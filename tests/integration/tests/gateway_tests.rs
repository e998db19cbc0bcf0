//! Gateway Integration Tests
//!
//! Each test starts its own gateway on an ephemeral loopback port.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::{
    audio_json_message, config_message, next_event, pcm_chunk, start_message, stop_message,
    TestServer, WsClient,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use stream_gateway::events::GatewayEvent;

// ============================================================================
// HTTP Surface
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_stats_reflect_live_connections() {
    let server = TestServer::start().await.unwrap();
    let (_a, _) = server.connect("/?sessionId=S1").await.unwrap();
    let (_b, _) = server.connect("/stream?sessionId=S1").await.unwrap();
    let (_c, _) = server.connect("/").await.unwrap();
    server.wait_for_connections(3).await.unwrap();

    let stats: Value = server.get("/stats").await.unwrap().json().await.unwrap();
    assert_eq!(stats["connections"], 3);
    assert_eq!(stats["sessions"], 2);
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_welcome_echoes_supplied_session() {
    let server = TestServer::start().await.unwrap();

    let (_client, welcome) = server.connect("/?sessionId=S1").await.unwrap();
    assert_eq!(welcome.session_id, "S1");
    assert!(welcome.connection_id.starts_with("client_"));

    let (_client, welcome) = server.connect("/stream?session=S2").await.unwrap();
    assert_eq!(welcome.session_id, "S2");
}

#[tokio::test]
async fn test_welcome_generates_session_when_absent() {
    let server = TestServer::start().await.unwrap();

    let (_a, first) = server.connect("/").await.unwrap();
    let (_b, second) = server.connect("/?sessionId=").await.unwrap();

    assert!(first.session_id.starts_with("session_"));
    assert!(second.session_id.starts_with("session_"));
    assert_ne!(first.session_id, second.session_id);
    assert_ne!(first.connection_id, second.connection_id);
}

#[tokio::test]
async fn test_welcome_message_shape() {
    let server = TestServer::start().await.unwrap();
    let mut client = WsClient::connect(&server.ws_url("/?sessionId=S9")).await.unwrap();

    let welcome = client.recv_json().await.unwrap();
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["sessionId"], "S9");
    assert!(welcome["connectionId"].is_string());
    assert!(welcome["timestamp"].is_i64());
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_send_to_session_reaches_only_members() {
    let server = TestServer::start().await.unwrap();
    let (mut a, _) = server.connect("/?sessionId=S1").await.unwrap();
    let (mut b, _) = server.connect("/?sessionId=S1").await.unwrap();
    let (mut c, _) = server.connect("/?sessionId=S2").await.unwrap();
    server.wait_for_connections(3).await.unwrap();

    let delivered = server
        .gateway
        .dispatcher()
        .send_to_session("S1", json!({"transcript": "hello"}));
    assert_eq!(delivered, 2);

    assert_eq!(a.recv_json().await.unwrap()["transcript"], "hello");
    assert_eq!(b.recv_json().await.unwrap()["transcript"], "hello");
    c.expect_silence(Duration::from_millis(200)).await.unwrap();
}

#[tokio::test]
async fn test_send_to_unknown_targets_delivers_nothing() {
    let server = TestServer::start().await.unwrap();
    let dispatcher = server.gateway.dispatcher();

    assert_eq!(dispatcher.send_to_session("nobody", "x"), 0);
    assert!(!dispatcher.send_to_connection("client_missing", "x"));
    assert_eq!(dispatcher.broadcast("x"), 0);
}

#[tokio::test]
async fn test_send_to_connection_and_broadcast() {
    let server = TestServer::start().await.unwrap();
    let (mut a, welcome) = server.connect("/?sessionId=S1").await.unwrap();
    let (mut b, _) = server.connect("/?sessionId=S2").await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    let dispatcher = server.gateway.dispatcher();
    assert!(dispatcher.send_to_connection(&welcome.connection_id, json!({"n": 1})));
    assert_eq!(a.recv_json().await.unwrap()["n"], 1);
    b.expect_silence(Duration::from_millis(100)).await.unwrap();

    assert_eq!(dispatcher.broadcast(json!({"n": 2})), 2);
    assert_eq!(a.recv_json().await.unwrap()["n"], 2);
    assert_eq!(b.recv_json().await.unwrap()["n"], 2);
}

// ============================================================================
// Classification
// ============================================================================

#[tokio::test]
async fn test_binary_frame_becomes_data_chunk() {
    let server = TestServer::start().await.unwrap();
    let mut events = server.gateway.subscribe();
    let (mut client, _) = server.connect("/?sessionId=S1").await.unwrap();

    client.send_binary(pcm_chunk()).await.unwrap();

    let chunk = next_event(&mut events, |event| match event {
        GatewayEvent::DataChunk(chunk) => Some(chunk),
        _ => None,
    })
    .await
    .unwrap();

    assert_eq!(chunk.session_id, "S1");
    assert_eq!(chunk.data, pcm_chunk());
    assert!(chunk.format.is_none());
}

#[tokio::test]
async fn test_audio_json_becomes_data_chunk() {
    let server = TestServer::start().await.unwrap();
    let mut events = server.gateway.subscribe();
    let (mut client, _) = server.connect("/?sessionId=S1").await.unwrap();

    client.send_json(&audio_json_message()).await.unwrap();

    let chunk = next_event(&mut events, |event| match event {
        GatewayEvent::DataChunk(chunk) => Some(chunk),
        _ => None,
    })
    .await
    .unwrap();

    assert_eq!(chunk.data, vec![0, 1, 2, 3]);
    let format = chunk.format.expect("declared format");
    assert_eq!(format.sample_rate, Some(json!(16000)));
}

#[tokio::test]
async fn test_start_and_stop_are_acknowledged() {
    let server = TestServer::start().await.unwrap();
    let (mut client, _) = server.connect("/?sessionId=S1").await.unwrap();

    client.send_json(&start_message()).await.unwrap();
    let ack = client.recv_json().await.unwrap();
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["message"], "Streaming started");

    client.send_json(&stop_message()).await.unwrap();
    let ack = client.recv_json().await.unwrap();
    assert_eq!(ack["message"], "Streaming stopped");
}

#[tokio::test]
async fn test_config_message_surfaces_without_reply() {
    let server = TestServer::start().await.unwrap();
    let mut events = server.gateway.subscribe();
    let (mut client, _) = server.connect("/?sessionId=S1").await.unwrap();

    client.send_json(&config_message(48000)).await.unwrap();

    let message = next_event(&mut events, |event| match event {
        GatewayEvent::ControlMessage { message, .. } => Some(message),
        _ => None,
    })
    .await
    .unwrap();

    assert_eq!(message.message_type(), Some("config"));
    assert_eq!(message.get("sampleRate"), Some(&json!(48000)));
    client.expect_silence(Duration::from_millis(200)).await.unwrap();
}

#[tokio::test]
async fn test_malformed_text_reports_error_and_keeps_connection() {
    let server = TestServer::start().await.unwrap();
    let mut events = server.gateway.subscribe();
    let (mut client, welcome) = server.connect("/?sessionId=S1").await.unwrap();

    client.send_text("this is not json").await.unwrap();

    let connection_id = next_event(&mut events, |event| match event {
        GatewayEvent::Error { connection, .. } => Some(connection.connection_id().to_string()),
        _ => None,
    })
    .await
    .unwrap();
    assert_eq!(connection_id, welcome.connection_id);

    // No reply to the bad frame, and the connection still works
    client.expect_silence(Duration::from_millis(200)).await.unwrap();
    assert!(server.gateway.registry().contains(&welcome.connection_id));

    client.send_json(&start_message()).await.unwrap();
    assert_eq!(client.recv_json().await.unwrap()["type"], "ack");
}

// ============================================================================
// Disconnect
// ============================================================================

#[tokio::test]
async fn test_client_close_emits_disconnected() {
    let server = TestServer::start().await.unwrap();
    let mut events = server.gateway.subscribe();
    let (mut client, welcome) = server.connect("/?sessionId=S1").await.unwrap();

    client.close().await.unwrap();

    let (id, code) = next_event(&mut events, |event| match event {
        GatewayEvent::Disconnected {
            connection, code, ..
        } => Some((connection.connection_id().to_string(), code)),
        _ => None,
    })
    .await
    .unwrap();

    assert_eq!(id, welcome.connection_id);
    assert_eq!(code, 1000);
    server.wait_for_connections(0).await.unwrap();
}

// ============================================================================
// Heartbeat
// ============================================================================

#[tokio::test]
async fn test_unresponsive_client_is_evicted() {
    let server = TestServer::start_with_heartbeat(100).await.unwrap();
    let mut events = server.gateway.subscribe();

    // Never polled, so pings go unanswered
    let mut client = WsClient::connect(&server.ws_url("/?sessionId=S1")).await.unwrap();

    let code = next_event(&mut events, |event| match event {
        GatewayEvent::Disconnected { code, .. } => Some(code),
        _ => None,
    })
    .await
    .unwrap();
    assert_eq!(code, 4009);
    assert_eq!(server.gateway.registry().connection_count(), 0);

    let (code, reason) = client.expect_close().await.unwrap();
    assert_eq!(code, 4009);
    assert_eq!(reason, "heartbeat timeout");
}

#[tokio::test]
async fn test_responsive_client_survives_probes() {
    let server = TestServer::start_with_heartbeat(100).await.unwrap();
    let (client, welcome) = server.connect("/?sessionId=S1").await.unwrap();
    let reader = client.spawn_reader();

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(server.gateway.registry().contains(&welcome.connection_id));
    reader.abort();
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_close_sends_going_away_and_refuses_new_connections() {
    let server = TestServer::start().await.unwrap();
    let (mut a, _) = server.connect("/?sessionId=S1").await.unwrap();
    let (mut b, _) = server.connect("/?sessionId=S2").await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    assert!(server.gateway.close());
    assert!(!server.gateway.close());

    assert_eq!(a.expect_close().await.unwrap().0, 1001);
    assert_eq!(b.expect_close().await.unwrap().0, 1001);
    assert_eq!(server.gateway.registry().connection_count(), 0);

    assert!(server.connect("/").await.is_err());
}
