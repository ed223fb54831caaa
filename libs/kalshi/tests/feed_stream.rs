//! End-to-end feed behavior against a local mock venue: subscribe/ack,
//! book reconstruction from literal frames, and reconnect with
//! resubscribe + snapshot reset.

use feedsock::ConnectionState;
use futures::{SinkExt, StreamExt};
use kalshi::{FeedMessage, KalshiClient, KalshiConfig, OrderbookManager, Side};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

const TICKER: &str = "KXBTC-25DEC31";

fn test_key_pem() -> &'static str {
    static PEM: OnceLock<String> = OnceLock::new();
    PEM.get_or_init(|| {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string()
    })
}

/// Mock venue: acks subscribe commands and streams book messages. The
/// first connection is dropped right after its snapshot to force a
/// reconnect; later connections stay up and serve different levels.
async fn start_mock_venue() -> (std::net::SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    {
        let connections = Arc::clone(&connections);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let conn = connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    let (mut write, mut read) = ws.split();
                    let mut next_sid = 100 * (conn as u64 + 1);

                    while let Some(Ok(message)) = read.next().await {
                        match message {
                            Message::Text(text) => {
                                let command: Value = match serde_json::from_str(&text) {
                                    Ok(v) => v,
                                    Err(_) => continue,
                                };
                                if command["cmd"] != "subscribe" {
                                    continue;
                                }
                                let id = command["id"].as_u64().unwrap_or(0);
                                let channel = command["params"]["channels"][0]
                                    .as_str()
                                    .unwrap_or("")
                                    .to_string();
                                next_sid += 1;

                                let ack = json!({
                                    "id": id,
                                    "type": "subscribed",
                                    "msg": {"channel": channel, "sid": next_sid}
                                });
                                if write.send(Message::Text(ack.to_string())).await.is_err() {
                                    return;
                                }

                                if channel == "orderbook_delta" {
                                    if conn == 0 {
                                        let snapshot = json!({
                                            "type": "orderbook_snapshot",
                                            "sid": next_sid,
                                            "seq": 10,
                                            "msg": {"market_ticker": TICKER,
                                                    "yes": [[50, 100]], "no": [[40, 80]]}
                                        });
                                        let delta = json!({
                                            "type": "orderbook_delta",
                                            "sid": next_sid,
                                            "seq": 11,
                                            "msg": {"market_ticker": TICKER,
                                                    "price": 50, "delta": -40, "side": "yes"}
                                        });
                                        let _ = write
                                            .send(Message::Text(snapshot.to_string()))
                                            .await;
                                        let _ =
                                            write.send(Message::Text(delta.to_string())).await;
                                        // Abrupt drop to force a reconnect
                                        return;
                                    } else {
                                        let snapshot = json!({
                                            "type": "orderbook_snapshot",
                                            "sid": next_sid,
                                            "seq": 1,
                                            "msg": {"market_ticker": TICKER,
                                                    "yes": [[55, 30]], "no": [[42, 10]]}
                                        });
                                        let _ = write
                                            .send(Message::Text(snapshot.to_string()))
                                            .await;
                                    }
                                }
                            }
                            Message::Ping(payload) => {
                                let _ = write.send(Message::Pong(payload)).await;
                            }
                            Message::Close(_) => return,
                            _ => {}
                        }
                    }
                });
            }
        });
    }

    (addr, connections)
}

fn client_for(addr: std::net::SocketAddr) -> KalshiClient {
    let mut key_file = tempfile::NamedTempFile::new().unwrap();
    key_file.write_all(test_key_pem().as_bytes()).unwrap();
    let (_, key_path) = key_file.keep().unwrap();

    let mut config = KalshiConfig::new("test-key-id", key_path.to_str().unwrap());
    config.ws_url = format!("ws://{}/trade-api/ws/v2", addr);
    KalshiClient::new(config).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn subscribe_stream_reconnect_and_reset() {
    let (addr, connections) = start_mock_venue().await;
    let client = client_for(addr);

    let mut feed = client.feed().await.unwrap();
    let subscription = feed.subscribe_orderbook(&[TICKER]).await.unwrap();
    assert_eq!(feed.state(), ConnectionState::Active);
    let first_sid = subscription.sid;

    let mut books = OrderbookManager::new();

    // Snapshot then in-sequence delta from the first connection
    let first = feed.next().await.unwrap();
    assert!(matches!(first, FeedMessage::Snapshot(_)));
    books.apply(&first);

    let second = feed.next().await.unwrap();
    assert!(matches!(second, FeedMessage::Delta(_)));
    books.apply(&second);

    let book = books.book(TICKER).unwrap().unwrap();
    assert_eq!(book.side(Side::Yes).quantity_at(50), 60);
    assert_eq!(book.best_bid(Side::No), Some(40));

    // The server dropped the connection; the feed reconnects, replays the
    // subscription, and the venue responds with a fresh snapshot that
    // resets the book wholesale
    let third = feed.next().await.unwrap();
    match &third {
        FeedMessage::Snapshot(snapshot) => assert_eq!(snapshot.seq, 1),
        other => panic!("expected post-reconnect snapshot, got {:?}", other),
    }
    books.apply(&third);

    let book = books.book(TICKER).unwrap().unwrap();
    assert_eq!(book.best_bid(Side::Yes), Some(55));
    assert_eq!(book.side(Side::Yes).quantity_at(50), 0);

    assert!(connections.load(Ordering::SeqCst) >= 2);
    // Re-acknowledgment assigned a fresh sid
    let resubscribed = feed.subscriptions();
    assert_eq!(resubscribed.len(), 1);
    assert_ne!(resubscribed[0].sid, first_sid);
    assert_eq!(feed.state(), ConnectionState::Active);

    feed.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn ticker_subscription_acks_without_data() {
    let (addr, _connections) = start_mock_venue().await;
    let client = client_for(addr);

    let mut feed = client.feed().await.unwrap();
    let subscription = feed.subscribe_ticker(&["kxbtc-25dec31"]).await.unwrap();

    assert_eq!(subscription.channel, kalshi::Channel::Ticker);
    assert!(subscription.sid > 0);
    assert_eq!(feed.state(), ConnectionState::Active);

    feed.close().await.unwrap();
}
