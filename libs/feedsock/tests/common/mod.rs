//! Common test utilities for FeedSock integration tests.

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Commands a test can issue to the currently-connected client
#[derive(Debug, Clone)]
pub enum ServerCommand {
    /// Send a text frame to the client
    SendText(String),
    /// Drop the current connection without a close handshake
    DropConnection,
}

/// What the server observed from a client, tagged with the connection
/// number (0 for the first connection, 1 after the first reconnect, ...)
#[derive(Debug, Clone)]
pub struct Received {
    pub connection: usize,
    pub text: String,
}

/// A mock WebSocket server for driving the client through its lifecycle.
///
/// Each accepted connection forwards inbound text frames to `received`
/// and obeys `ServerCommand`s broadcast by the test.
pub struct MockWsServer {
    pub addr: SocketAddr,
    pub received: crossbeam_channel::Receiver<Received>,
    command_tx: broadcast::Sender<ServerCommand>,
    connections: Arc<AtomicUsize>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (received_tx, received_rx) = crossbeam_channel::unbounded();
        let (command_tx, _) = broadcast::channel(64);
        let connections = Arc::new(AtomicUsize::new(0));

        {
            let command_tx = command_tx.clone();
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    let conn = connections.fetch_add(1, Ordering::SeqCst);
                    let received_tx = received_tx.clone();
                    let command_rx = command_tx.subscribe();
                    tokio::spawn(async move {
                        handle_connection(stream, conn, received_tx, command_rx).await;
                    });
                }
            });
        }

        Self {
            addr,
            received: received_rx,
            command_tx,
            connections,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.command_tx.send(ServerCommand::SendText(text.into()));
    }

    pub fn drop_connection(&self) {
        let _ = self.command_tx.send(ServerCommand::DropConnection);
    }

    /// Number of connections accepted so far
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Wait for the next inbound text frame, failing after `timeout`
    pub async fn expect_received(&self, timeout: std::time::Duration) -> Received {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(received) = self.received.try_recv() {
                return received;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for a frame from the client"
            );
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    connection: usize,
    received_tx: crossbeam_channel::Sender<Received>,
    mut command_rx: broadcast::Receiver<ServerCommand>,
) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(tokio_tungstenite::tungstenite::Message::Text(text))) => {
                        let _ = received_tx.send(Received { connection, text });
                    }
                    Some(Ok(tokio_tungstenite::tungstenite::Message::Ping(payload))) => {
                        if write
                            .send(tokio_tungstenite::tungstenite::Message::Pong(payload))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Ok(ServerCommand::SendText(text)) => {
                        if write
                            .send(tokio_tungstenite::tungstenite::Message::Text(text))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Ok(ServerCommand::DropConnection) => {
                        // Abrupt drop: no close handshake
                        break;
                    }
                    Err(_) => break,
                }
            }
        }
    }
}
