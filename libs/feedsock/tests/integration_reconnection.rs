//! Integration tests against a local mock WebSocket server: connect,
//! ordered delivery, abrupt disconnect, reconnect with subscription
//! replay, and heartbeat pings.

mod common;

use common::MockWsServer;
use feedsock::{
    ConnectionState, FixedDelay, Heartbeat, MessageDecoder, SocketClient, SocketConfig, WsMessage,
};
use std::time::Duration;

/// Decoder that surfaces text frames verbatim
struct LineDecoder;

impl MessageDecoder for LineDecoder {
    type Frame = String;

    fn decode(&self, message: WsMessage) -> feedsock::Result<Option<String>> {
        Ok(message.as_text().map(|s| s.to_string()))
    }
}

async fn wait_for(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn recv_frame(
    frames: &crossbeam_channel::Receiver<String>,
    timeout: Duration,
) -> Option<String> {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if let Ok(frame) = frames.try_recv() {
            return Some(frame);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connect_and_ordered_delivery() {
    let server = MockWsServer::start().await;

    let config = SocketConfig::new(server.url(), LineDecoder)
        .with_reconnect_strategy(FixedDelay::new(Duration::from_millis(100), None));
    let client = SocketClient::spawn(config);

    assert!(wait_for(|| client.is_connected(), Duration::from_secs(5)).await);

    let frames = client.frames();
    for i in 0..5 {
        server.send_text(format!("msg-{}", i));
    }
    for i in 0..5 {
        let frame = recv_frame(&frames, Duration::from_secs(2)).await;
        assert_eq!(frame.as_deref(), Some(format!("msg-{}", i).as_str()));
    }

    client.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reconnect_replays_subscriptions_in_order() {
    let server = MockWsServer::start().await;

    let config = SocketConfig::new(server.url(), LineDecoder)
        .with_reconnect_strategy(FixedDelay::new(Duration::from_millis(50), None));
    let client = SocketClient::spawn(config);

    assert!(wait_for(|| client.is_connected(), Duration::from_secs(5)).await);

    client
        .register_subscription(WsMessage::Text("sub-a".into()))
        .unwrap();
    client
        .register_subscription(WsMessage::Text("sub-b".into()))
        .unwrap();

    let first = server.expect_received(Duration::from_secs(2)).await;
    let second = server.expect_received(Duration::from_secs(2)).await;
    assert_eq!(first.connection, 0);
    assert_eq!((first.text.as_str(), second.text.as_str()), ("sub-a", "sub-b"));

    // Abrupt transport loss: the client must reconnect and replay both
    // subscriptions in registration order before anything else
    server.drop_connection();
    assert!(wait_for(|| server.connection_count() >= 2, Duration::from_secs(5)).await);

    let replay_a = server.expect_received(Duration::from_secs(5)).await;
    let replay_b = server.expect_received(Duration::from_secs(5)).await;
    assert!(replay_a.connection >= 1);
    assert_eq!(
        (replay_a.text.as_str(), replay_b.text.as_str()),
        ("sub-a", "sub-b")
    );

    // The new connection still delivers data
    let frames = client.frames();
    server.send_text("after-reconnect");
    assert_eq!(
        recv_frame(&frames, Duration::from_secs(2)).await.as_deref(),
        Some("after-reconnect")
    );

    assert!(client.metrics().reconnect_count >= 1);

    client.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deregistered_subscription_not_replayed() {
    let server = MockWsServer::start().await;

    let config = SocketConfig::new(server.url(), LineDecoder)
        .with_reconnect_strategy(FixedDelay::new(Duration::from_millis(50), None));
    let client = SocketClient::spawn(config);

    assert!(wait_for(|| client.is_connected(), Duration::from_secs(5)).await);

    let keep = client
        .register_subscription(WsMessage::Text("keep".into()))
        .unwrap();
    let drop_me = client
        .register_subscription(WsMessage::Text("drop-me".into()))
        .unwrap();
    let _ = keep;

    // Both go out on the live connection
    assert_eq!(server.expect_received(Duration::from_secs(2)).await.text, "keep");
    assert_eq!(
        server.expect_received(Duration::from_secs(2)).await.text,
        "drop-me"
    );

    client.deregister_subscription(drop_me).unwrap();
    // Give the command a moment to land before forcing the reconnect
    tokio::time::sleep(Duration::from_millis(300)).await;

    server.drop_connection();
    assert!(wait_for(|| server.connection_count() >= 2, Duration::from_secs(5)).await);

    let replayed = server.expect_received(Duration::from_secs(5)).await;
    assert_eq!(replayed.text, "keep");
    // Nothing further should be replayed
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server.received.try_recv().is_err());

    client.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_is_terminal() {
    let server = MockWsServer::start().await;

    let config = SocketConfig::new(server.url(), LineDecoder)
        .with_reconnect_strategy(FixedDelay::new(Duration::from_millis(50), None));
    let client = SocketClient::spawn(config);

    assert!(wait_for(|| client.is_connected(), Duration::from_secs(5)).await);
    let connections_before = server.connection_count();

    client.shutdown().await.unwrap();

    // No reconnection after an explicit close
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connection_count(), connections_before);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_heartbeat_pings_keep_connection_alive() {
    let server = MockWsServer::start().await;

    let config = SocketConfig::new(server.url(), LineDecoder)
        .with_heartbeat(Heartbeat::new(Duration::from_millis(100)))
        .with_reconnect_strategy(FixedDelay::new(Duration::from_millis(50), None));
    let client = SocketClient::spawn(config);

    assert!(wait_for(|| client.is_connected(), Duration::from_secs(5)).await);

    // The server's tungstenite stream answers pings automatically, so a
    // few heartbeat intervals later the connection is still the first one
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.connection_count(), 1);
    assert_ne!(client.state(), ConnectionState::Disconnected);

    client.shutdown().await.unwrap();
}
