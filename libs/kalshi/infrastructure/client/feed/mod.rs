//! Real-time market-data feed.
//!
//! [`Feed`] manages one persistent WebSocket connection to the venue:
//! signed handshake, subscribe/unsubscribe with server acknowledgment,
//! heartbeats, and reconnect-with-resubscribe. Messages come out of
//! [`Feed::next`] as one ordered sequence of typed [`FeedMessage`]s;
//! control frames (acks, errors) are absorbed internally.
//!
//! On a transport loss every previously-acknowledged subscription is
//! reissued, in original order, before the connection state returns to
//! `Active`. Sequence continuity is not guaranteed across that boundary;
//! the venue re-sends a snapshot per book subscription, which resets the
//! [`OrderbookManager`] books wholesale.

pub mod book;
pub mod types;

pub use book::OrderbookManager;
pub use types::{
    BookDelta, BookSnapshot, Channel, Command, FeedMessage, FillUpdate, KalshiDecoder,
    TickerUpdate, TradeUpdate,
};

use super::sign::RequestSigner;
use crate::config::KalshiConfig;
use crate::error::{KalshiError, Result};
use async_trait::async_trait;
use feedsock::{
    AtomicConnectionState, ConnectionState, ExponentialBackoff, FeedSockError, HeaderProvider,
    Headers, Heartbeat, SocketClient, SocketConfig, SocketEvent, SubscriptionHandle,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const ACK_TIMEOUT: Duration = Duration::from_secs(10);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Signs the WebSocket handshake exactly like a REST request
struct WsHandshakeAuth {
    signer: Arc<RequestSigner>,
    path: String,
}

#[async_trait]
impl HeaderProvider for WsHandshakeAuth {
    async fn get_headers(&self) -> Headers {
        // Fresh timestamp/signature per (re)connect attempt
        self.signer.headers_for_path("GET", &self.path)
    }
}

/// An acknowledged subscription
#[derive(Debug, Clone)]
pub struct Subscription {
    /// The command id that created it
    pub id: u64,
    /// Server-assigned subscription id (refreshed on reconnect)
    pub sid: u64,
    pub channel: Channel,
}

struct SubEntry {
    id: u64,
    handle: SubscriptionHandle,
    channel: Channel,
    sid: u64,
}

/// A live feed connection.
///
/// Single consumer: all subscription acknowledgments and data messages
/// flow through this object, strictly in arrival order.
pub struct Feed {
    socket: SocketClient<KalshiDecoder>,
    state: Arc<AtomicConnectionState>,
    frames: crossbeam_channel::Receiver<FeedMessage>,
    events: crossbeam_channel::Receiver<SocketEvent>,
    next_id: u64,
    subs: Vec<SubEntry>,
    /// Command ids whose (re-)acknowledgment is still outstanding
    awaiting_acks: Vec<u64>,
    /// Data messages that arrived while waiting for an ack
    pending: VecDeque<FeedMessage>,
}

impl Feed {
    pub(crate) async fn connect(config: &KalshiConfig, signer: Arc<RequestSigner>) -> Result<Self> {
        let provider = Arc::new(WsHandshakeAuth {
            signer,
            path: config.ws_path(),
        });

        let socket_config = SocketConfig::new(config.ws_url.clone(), KalshiDecoder)
            .with_headers(provider)
            .with_heartbeat(Heartbeat::new(HEARTBEAT_INTERVAL))
            .with_reconnect_strategy(ExponentialBackoff::new(
                Duration::from_secs(1),
                Duration::from_secs(60),
                None,
            ));

        let socket = SocketClient::spawn(socket_config);
        let state = socket.state_handle();
        let frames = socket.frames();
        let events = socket.events();

        let feed = Self {
            socket,
            state,
            frames,
            events,
            next_id: 0,
            subs: Vec::new(),
            awaiting_acks: Vec::new(),
            pending: VecDeque::new(),
        };
        feed.wait_for_transport(CONNECT_TIMEOUT).await?;
        Ok(feed)
    }

    async fn wait_for_transport(&self, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.state.is_connected() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Err(KalshiError::Feed(FeedSockError::Timeout(
            "websocket connect".to_string(),
        )))
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Currently-acknowledged subscriptions
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subs
            .iter()
            .map(|entry| Subscription {
                id: entry.id,
                sid: entry.sid,
                channel: entry.channel,
            })
            .collect()
    }

    fn take_next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Subscribe to ticker updates for a set of markets
    pub async fn subscribe_ticker(&mut self, tickers: &[&str]) -> Result<Subscription> {
        self.subscribe(Channel::Ticker, tickers).await
    }

    /// Subscribe to order-book snapshots and deltas for a set of markets
    pub async fn subscribe_orderbook(&mut self, tickers: &[&str]) -> Result<Subscription> {
        self.subscribe(Channel::OrderbookDelta, tickers).await
    }

    /// Subscribe to public trades for a set of markets
    pub async fn subscribe_trades(&mut self, tickers: &[&str]) -> Result<Subscription> {
        self.subscribe(Channel::Trade, tickers).await
    }

    /// Subscribe to our own fills (account-wide)
    pub async fn subscribe_fills(&mut self) -> Result<Subscription> {
        self.subscribe(Channel::Fill, &[]).await
    }

    /// Send a subscribe command and wait for the server acknowledgment.
    ///
    /// Data messages arriving while we wait are buffered for
    /// [`Feed::next`], preserving arrival order.
    pub async fn subscribe(&mut self, channel: Channel, tickers: &[&str]) -> Result<Subscription> {
        let id = self.take_next_id();
        let tickers: Vec<String> = tickers.iter().map(|t| t.trim().to_uppercase()).collect();
        let command = Command::subscribe(id, channel, &tickers);

        // Subscriptions issued while Active go straight to ack-wait
        if self.state.get() != ConnectionState::Active {
            self.state.set(ConnectionState::Subscribing);
        }

        let handle = self.socket.register_subscription(command.to_ws_message())?;

        let deadline = tokio::time::Instant::now() + ACK_TIMEOUT;
        loop {
            if tokio::time::Instant::now() >= deadline {
                let _ = self.socket.deregister_subscription(handle);
                return Err(KalshiError::Feed(FeedSockError::Timeout(format!(
                    "no acknowledgment for {} subscription",
                    channel.as_str()
                ))));
            }

            let Some(message) = self.recv_frame(Duration::from_millis(100)).await else {
                continue;
            };
            // Connection events are sent before any frame from the same
            // connection is decoded; drain them first so reconnect
            // bookkeeping is current when the frame is absorbed
            self.drain_events();

            match message {
                FeedMessage::Subscribed {
                    id: ack_id, sid, ..
                } if ack_id == id => {
                    self.subs.push(SubEntry {
                        id,
                        handle,
                        channel,
                        sid,
                    });
                    if self.awaiting_acks.is_empty() {
                        self.state.set(ConnectionState::Active);
                    }
                    debug!("Subscribed to {} (sid {})", channel.as_str(), sid);
                    return Ok(Subscription { id, sid, channel });
                }
                FeedMessage::CommandError {
                    id: err_id,
                    code,
                    message,
                } if err_id == id => {
                    let _ = self.socket.deregister_subscription(handle);
                    return Err(KalshiError::InvalidRequest(format!(
                        "subscription rejected: {} (code {:?})",
                        message, code
                    )));
                }
                other => {
                    if let Some(data) = self.absorb_control(other) {
                        self.pending.push_back(data);
                    }
                }
            }
        }
    }

    /// Unsubscribe and stop replaying this subscription on reconnect
    pub async fn unsubscribe(&mut self, subscription: &Subscription) -> Result<()> {
        let Some(pos) = self.subs.iter().position(|e| e.id == subscription.id) else {
            return Ok(());
        };
        let entry = self.subs.remove(pos);

        let id = self.take_next_id();
        let command = Command::unsubscribe(id, vec![entry.sid]);
        self.socket.send(command.to_ws_message())?;
        self.socket.deregister_subscription(entry.handle)?;
        debug!("Unsubscribed sid {}", entry.sid);
        Ok(())
    }

    /// Next data message, in arrival order.
    ///
    /// Fails once the connection is closed for good (explicit close or an
    /// exhausted reconnection strategy).
    pub async fn next(&mut self) -> Result<FeedMessage> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Ok(message);
            }

            self.drain_events();

            match self.recv_frame(Duration::from_millis(100)).await {
                Some(message) => {
                    // Events from this connection were sent before the
                    // frame was decoded; drain them before absorbing it
                    self.drain_events();
                    if let Some(data) = self.absorb_control(message) {
                        return Ok(data);
                    }
                }
                None => {
                    if self.state.get() == ConnectionState::Disconnected {
                        // Drain anything decoded before the drop
                        if let Ok(message) = self.frames.try_recv() {
                            if let Some(data) = self.absorb_control(message) {
                                return Ok(data);
                            }
                            continue;
                        }
                        return Err(KalshiError::Feed(FeedSockError::ConnectionClosed(
                            "feed closed".to_string(),
                        )));
                    }
                }
            }
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                SocketEvent::Connected => {
                    if !self.subs.is_empty() {
                        // The socket replayed our subscriptions; the
                        // stream is not usable until every one re-acks
                        self.awaiting_acks = self.subs.iter().map(|e| e.id).collect();
                        self.state.set(ConnectionState::Subscribing);
                    }
                }
                SocketEvent::Reconnecting(attempt) => {
                    debug!("Feed reconnecting (attempt {})", attempt);
                }
                SocketEvent::Disconnected => {}
                SocketEvent::Error(error) => warn!("Feed transport error: {}", error),
            }
        }
    }

    /// Handle control messages internally; return data messages.
    fn absorb_control(&mut self, message: FeedMessage) -> Option<FeedMessage> {
        match message {
            FeedMessage::Subscribed { id, sid, channel } => {
                if let Some(entry) = self.subs.iter_mut().find(|e| e.id == id) {
                    entry.sid = sid;
                    debug!("Re-acknowledged {} subscription (sid {})", channel, sid);
                }
                self.awaiting_acks.retain(|&pending| pending != id);
                if self.awaiting_acks.is_empty()
                    && matches!(
                        self.state.get(),
                        ConnectionState::Subscribing | ConnectionState::Connected
                    )
                {
                    self.state.set(ConnectionState::Active);
                }
                None
            }
            FeedMessage::CommandError { id, code, message } => {
                warn!("Feed command {} rejected: {} (code {:?})", id, message, code);
                self.awaiting_acks.retain(|&pending| pending != id);
                None
            }
            FeedMessage::Unsubscribed { sid } => {
                self.subs.retain(|entry| entry.sid != sid);
                None
            }
            data => Some(data),
        }
    }

    async fn recv_frame(&self, timeout: Duration) -> Option<FeedMessage> {
        let rx = self.frames.clone();
        tokio::task::spawn_blocking(move || rx.recv_timeout(timeout))
            .await
            .ok()?
            .ok()
    }

    /// Close the feed. Terminal: no reconnection follows.
    pub async fn close(self) -> Result<()> {
        self.socket.shutdown().await?;
        Ok(())
    }
}
