use crate::core::config::SocketConfig;
use crate::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::core::heartbeat::spawn_heartbeat;
use crate::core::pong_tracker::PongTracker;
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Internal command messages for client control
#[derive(Debug)]
enum Command {
    /// Send a message to the WebSocket
    Send(WsMessage),
    /// Register a subscription payload: sent now and replayed on reconnect
    Register(u64, WsMessage),
    /// Remove a registered subscription payload from the replay list
    Deregister(u64),
    /// Shutdown the client
    Shutdown,
}

/// Events emitted by the connection task
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// Transport handshake succeeded
    Connected,
    /// Transport dropped (reconnection may follow)
    Disconnected,
    /// Reconnection attempt starting (attempt number)
    Reconnecting(usize),
    /// Error occurred
    Error(String),
}

/// Handle identifying a registered subscription payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle(u64);

/// Metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
}

/// Persistent WebSocket client with subscription replay.
///
/// One Tokio task owns the socket: it connects (signing the handshake via
/// the configured `HeaderProvider`), replays every registered subscription
/// in registration order, then decodes inbound frames inline and hands
/// them to the consumer through an unbounded channel — one ordered
/// sequence, restartable only by reconnecting.
///
/// A transport failure (including a missed heartbeat pong) tears the
/// connection down and re-enters the connect loop with the configured
/// backoff. An explicit `shutdown()` is terminal.
pub struct SocketClient<D>
where
    D: MessageDecoder,
{
    /// Client configuration (kept for API access)
    #[allow(dead_code)]
    config: Arc<SocketConfig<D>>,
    /// Atomic connection state, shared with the protocol layer
    state: Arc<AtomicConnectionState>,
    /// Atomic metrics
    metrics: Arc<AtomicMetrics>,
    /// Command channel sender
    command_tx: Sender<Command>,
    /// Event channel receiver
    event_rx: Receiver<SocketEvent>,
    /// Decoded frame receiver
    frame_rx: Receiver<D::Frame>,
    /// Main task handle
    task_handle: Option<tokio::task::JoinHandle<()>>,
    /// Shutdown flag - when false, the task stops reconnecting and exits
    shutdown_flag: Arc<AtomicBool>,
    /// Registration id counter
    next_registration: AtomicU64,
}

impl<D> SocketClient<D>
where
    D: MessageDecoder,
{
    /// Spawn the connection task for this configuration.
    ///
    /// The task starts connecting immediately; watch `events()` or
    /// `state()` to observe progress.
    pub fn spawn(config: SocketConfig<D>) -> Self {
        let config = Arc::new(config);
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected));
        let metrics = Arc::new(AtomicMetrics::new());
        let shutdown_flag = Arc::new(AtomicBool::new(true));

        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let (frame_tx, frame_rx) = unbounded();

        let task_handle = {
            let config = Arc::clone(&config);
            let state = Arc::clone(&state);
            let metrics = Arc::clone(&metrics);
            let shutdown_flag = Arc::clone(&shutdown_flag);

            tokio::spawn(async move {
                run_client(config, state, metrics, command_rx, event_tx, frame_tx, shutdown_flag)
                    .await;
            })
        };

        Self {
            config,
            state,
            metrics,
            command_tx,
            event_rx,
            frame_rx,
            task_handle: Some(task_handle),
            shutdown_flag,
            next_registration: AtomicU64::new(1),
        }
    }

    /// Send a message through the WebSocket
    pub fn send(&self, message: WsMessage) -> Result<()> {
        self.command_tx
            .send(Command::Send(message))
            .map_err(|e| FeedSockError::ChannelSend(e.to_string()))
    }

    /// Register a subscription payload.
    ///
    /// The payload is sent immediately and re-sent, in registration
    /// order, after every reconnect until deregistered.
    pub fn register_subscription(&self, message: WsMessage) -> Result<SubscriptionHandle> {
        let id = self.next_registration.fetch_add(1, Ordering::Relaxed);
        self.command_tx
            .send(Command::Register(id, message))
            .map_err(|e| FeedSockError::ChannelSend(e.to_string()))?;
        Ok(SubscriptionHandle(id))
    }

    /// Remove a subscription payload from the replay list.
    ///
    /// Does not send anything on the wire; the protocol layer sends its
    /// own unsubscribe command.
    pub fn deregister_subscription(&self, handle: SubscriptionHandle) -> Result<()> {
        self.command_tx
            .send(Command::Deregister(handle.0))
            .map_err(|e| FeedSockError::ChannelSend(e.to_string()))
    }

    /// Clone of the decoded-frame receiver.
    ///
    /// Frames arrive in exact network order. With a single consumer the
    /// sequence is gap-free for the lifetime of one connection.
    pub fn frames(&self) -> Receiver<D::Frame> {
        self.frame_rx.clone()
    }

    /// Clone of the connection event receiver
    pub fn events(&self) -> Receiver<SocketEvent> {
        self.event_rx.clone()
    }

    /// Current connection state
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Shared state handle.
    ///
    /// The protocol layer uses this to drive the `Subscribing`/`Active`
    /// transitions the socket itself cannot see.
    pub fn state_handle(&self) -> Arc<AtomicConnectionState> {
        Arc::clone(&self.state)
    }

    /// Check if the transport is up
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            reconnect_count: self.metrics.reconnect_count(),
            connection_state: self.state.get(),
        }
    }

    /// Shutdown the client. Terminal: no reconnection follows.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down WebSocket client");

        self.shutdown_flag.store(false, Ordering::Release);
        self.state.set(ConnectionState::ShuttingDown);
        let _ = self.command_tx.send(Command::Shutdown);

        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }

        info!("WebSocket client shut down");
        Ok(())
    }
}

/// Main client task loop
async fn run_client<D>(
    config: Arc<SocketConfig<D>>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    command_rx: Receiver<Command>,
    event_tx: Sender<SocketEvent>,
    frame_tx: Sender<D::Frame>,
    shutdown_flag: Arc<AtomicBool>,
) where
    D: MessageDecoder,
{
    let mut reconnect_attempt: usize = 0;
    // Registered subscription payloads, replayed in order on every connect
    let mut subscriptions: Vec<(u64, WsMessage)> = Vec::new();

    loop {
        if !shutdown_flag.load(Ordering::Acquire) || state.is_shutting_down() {
            debug!("Shutdown requested, exiting main loop");
            break;
        }

        state.set(if reconnect_attempt == 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        });

        if reconnect_attempt > 0 {
            let _ = event_tx.send(SocketEvent::Reconnecting(reconnect_attempt));
        }

        let connection_result = connect_with_headers(&config).await;

        match connection_result {
            Ok((ws_stream, _)) => {
                info!("Connected to {}", config.url);
                state.set(ConnectionState::Connected);
                let _ = event_tx.send(SocketEvent::Connected);

                reconnect_attempt = 0;

                if let Err(e) = handle_connection(
                    ws_stream,
                    &config,
                    &state,
                    &metrics,
                    &command_rx,
                    &frame_tx,
                    &mut subscriptions,
                    &shutdown_flag,
                )
                .await
                {
                    error!("Connection error: {}", e);
                    let _ = event_tx.send(SocketEvent::Error(e.to_string()));
                }

                let _ = event_tx.send(SocketEvent::Disconnected);
            }
            Err(e) => {
                error!("Failed to connect: {}", e);
                let _ = event_tx.send(SocketEvent::Error(e.to_string()));
            }
        }

        if !shutdown_flag.load(Ordering::Acquire) || state.is_shutting_down() {
            break;
        }

        match config.reconnect_strategy.next_delay(reconnect_attempt) {
            Some(delay) => {
                info!(
                    "Reconnecting in {:?} (attempt {})",
                    delay,
                    reconnect_attempt + 1
                );
                state.set(ConnectionState::Reconnecting);

                // Check the shutdown flag periodically during the wait
                let check_interval = Duration::from_millis(100);
                let mut elapsed = Duration::ZERO;
                while elapsed < delay {
                    if !shutdown_flag.load(Ordering::Acquire) {
                        debug!("Shutdown requested during reconnection delay");
                        state.set(ConnectionState::Disconnected);
                        return;
                    }
                    let step = std::cmp::min(check_interval, delay - elapsed);
                    tokio::time::sleep(step).await;
                    elapsed += step;
                }

                reconnect_attempt += 1;
                metrics.increment_reconnects();
            }
            None => {
                warn!("Reconnection strategy exhausted, stopping");
                break;
            }
        }
    }

    state.set(ConnectionState::Disconnected);
    info!("Socket task exiting");
}

/// Build the handshake request (with provider headers) and connect
async fn connect_with_headers<D>(
    config: &Arc<SocketConfig<D>>,
) -> std::result::Result<
    (
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        http::Response<Option<Vec<u8>>>,
    ),
    tokio_tungstenite::tungstenite::Error,
>
where
    D: MessageDecoder,
{
    if let Some(ref provider) = config.headers {
        let headers = provider.get_headers().await;

        match config.url.as_str().into_client_request() {
            Ok(mut request) => {
                for (key, value) in headers {
                    match key.parse::<http::header::HeaderName>() {
                        Ok(header_name) => match value.parse::<http::header::HeaderValue>() {
                            Ok(header_value) => {
                                request.headers_mut().insert(header_name, header_value);
                            }
                            Err(_) => {
                                warn!("Invalid header value for key '{}'", key);
                            }
                        },
                        Err(_) => {
                            warn!("Invalid header name: {}", key);
                        }
                    }
                }

                debug!("Connecting with handshake headers");
                connect_async(request).await
            }
            Err(e) => {
                error!("Failed to create request: {}", e);
                connect_async(&config.url).await
            }
        }
    } else {
        connect_async(&config.url).await
    }
}

/// Handle an active WebSocket connection
#[allow(clippy::too_many_arguments)]
async fn handle_connection<D>(
    ws_stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    config: &Arc<SocketConfig<D>>,
    state: &Arc<AtomicConnectionState>,
    metrics: &Arc<AtomicMetrics>,
    command_rx: &Receiver<Command>,
    frame_tx: &Sender<D::Frame>,
    subscriptions: &mut Vec<(u64, WsMessage)>,
    shutdown_flag: &Arc<AtomicBool>,
) -> Result<()>
where
    D: MessageDecoder,
{
    let (mut write, mut read) = ws_stream.split();

    // Replay registered subscriptions in registration order before any
    // inbound data is surfaced
    for (_, sub) in subscriptions.iter() {
        let msg = ws_message_to_tungstenite(sub);
        write
            .send(msg)
            .await
            .map_err(|e| FeedSockError::WebSocket(format!("Failed to send subscription: {}", e)))?;
        metrics.increment_sent();
        debug!("Replayed subscription payload");
    }

    // A fresh tracker per connection; a stale pong from the previous
    // socket must not count for this one
    let pong_tracker = config
        .heartbeat
        .as_ref()
        .map(|hb| PongTracker::new(hb.timeout));

    let heartbeat_handle = config
        .heartbeat
        .as_ref()
        .map(|hb| spawn_heartbeat(hb.interval, WsMessage::Ping(Vec::new())));

    let result = message_loop(
        &mut write,
        &mut read,
        config,
        state,
        metrics,
        command_rx,
        frame_tx,
        subscriptions,
        heartbeat_handle.as_ref().map(|(_, _, rx)| rx),
        pong_tracker.as_ref(),
        shutdown_flag,
    )
    .await;

    // Stop the heartbeat task; it exits at its next tick
    if let Some((_handle, shutdown_tx, _)) = heartbeat_handle {
        let _ = shutdown_tx.send(());
    }

    result
}

/// Main message processing loop
#[allow(clippy::too_many_arguments)]
async fn message_loop<D>(
    write: &mut futures::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        Message,
    >,
    read: &mut futures::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    >,
    config: &Arc<SocketConfig<D>>,
    state: &Arc<AtomicConnectionState>,
    metrics: &Arc<AtomicMetrics>,
    command_rx: &Receiver<Command>,
    frame_tx: &Sender<D::Frame>,
    subscriptions: &mut Vec<(u64, WsMessage)>,
    heartbeat_rx: Option<&Receiver<WsMessage>>,
    pong_tracker: Option<&PongTracker>,
    shutdown_flag: &Arc<AtomicBool>,
) -> Result<()>
where
    D: MessageDecoder,
{
    loop {
        if !shutdown_flag.load(Ordering::Acquire) || state.is_shutting_down() {
            debug!("Shutdown detected in message loop, closing connection");
            let _ = write.close().await;
            return Ok(());
        }

        tokio::select! {
            // Handle incoming messages
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Ping(payload))) => {
                        // Server-initiated keepalive: answer inline
                        write.send(Message::Pong(payload)).await.map_err(|e| {
                            FeedSockError::WebSocket(format!("Failed to send pong: {}", e))
                        })?;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        if let Some(tracker) = pong_tracker {
                            tracker.record_pong_received();
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        warn!("Server closed connection: {:?}", frame);
                        return Err(FeedSockError::ConnectionClosed("Close frame".into()));
                    }
                    Some(Ok(msg)) => {
                        metrics.increment_received();

                        if let Some(ws_msg) = tungstenite_to_ws_message(msg) {
                            // Decode inline: the consumer must see frames in
                            // exact arrival order
                            match config.decoder.decode(ws_msg) {
                                Ok(Some(frame)) => {
                                    if frame_tx.send(frame).is_err() {
                                        debug!("Frame consumer dropped, discarding message");
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    warn!("Dropping undecodable frame: {}", e);
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        return Err(FeedSockError::WebSocket(e.to_string()));
                    }
                    None => {
                        warn!("WebSocket stream closed");
                        return Err(FeedSockError::ConnectionClosed("Stream ended".into()));
                    }
                }
            }

            // Handle commands (blocking recv moved off the async thread)
            cmd = async {
                let rx = command_rx.clone();
                tokio::task::spawn_blocking(move || {
                    rx.recv_timeout(Duration::from_millis(100))
                }).await.ok()
            } => {
                match cmd {
                    Some(Ok(Command::Send(msg))) => {
                        let tung_msg = ws_message_to_tungstenite(&msg);
                        write.send(tung_msg).await.map_err(|e| {
                            FeedSockError::WebSocket(e.to_string())
                        })?;
                        metrics.increment_sent();
                    }
                    Some(Ok(Command::Register(id, msg))) => {
                        subscriptions.push((id, msg.clone()));
                        let tung_msg = ws_message_to_tungstenite(&msg);
                        write.send(tung_msg).await.map_err(|e| {
                            FeedSockError::WebSocket(format!("Failed to send subscription: {}", e))
                        })?;
                        metrics.increment_sent();
                        debug!("Registered subscription {}", id);
                    }
                    Some(Ok(Command::Deregister(id))) => {
                        subscriptions.retain(|(sub_id, _)| *sub_id != id);
                        debug!("Deregistered subscription {}", id);
                    }
                    Some(Ok(Command::Shutdown)) => {
                        info!("Received shutdown command");
                        state.set(ConnectionState::ShuttingDown);
                        let _ = write.close().await;
                        return Ok(());
                    }
                    Some(Err(_)) => {
                        // Timeout is normal, just continue the loop
                    }
                    None => {
                        debug!("Command channel closed");
                        return Ok(());
                    }
                }
            }

            // Heartbeat ticks from the dedicated heartbeat task
            hb = async {
                if let Some(rx) = heartbeat_rx {
                    let rx_clone = rx.clone();
                    tokio::task::spawn_blocking(move || {
                        rx_clone.recv_timeout(Duration::from_millis(100))
                    }).await.ok().and_then(|r| r.ok())
                } else {
                    std::future::pending().await
                }
            } => {
                if let Some(ping) = hb {
                    // A tick is also when we audit the previous ping: a
                    // missed pong means the transport is dead
                    if let Some(tracker) = pong_tracker {
                        if !tracker.is_healthy() {
                            return Err(FeedSockError::HeartbeatTimeout(format!(
                                "no pong for {:?}",
                                tracker.time_since_last_pong()
                            )));
                        }
                    }

                    let tung_msg = ws_message_to_tungstenite(&ping);
                    write.send(tung_msg).await.map_err(|e| {
                        FeedSockError::WebSocket(format!("Failed to send heartbeat: {}", e))
                    })?;
                    if let Some(tracker) = pong_tracker {
                        tracker.record_ping_sent();
                    }
                    metrics.increment_sent();
                }
            }
        }
    }
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: &WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text.clone()),
        WsMessage::Binary(data) => Message::Binary(data.clone()),
        WsMessage::Ping(data) => Message::Ping(data.clone()),
        WsMessage::Pong(data) => Message::Pong(data.clone()),
    }
}

/// Convert tungstenite Message to WsMessage (data frames only)
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
