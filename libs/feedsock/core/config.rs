use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Heartbeat configuration.
///
/// A ping is sent every `interval`; if no pong arrives within `timeout`
/// of a ping the connection is treated as dead and rebuilt. `timeout`
/// should comfortably exceed `interval`.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: interval * 3,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Configuration for a `SocketClient`.
pub struct SocketConfig<D>
where
    D: MessageDecoder,
{
    /// WebSocket URL (wss:// or ws://)
    pub(crate) url: String,

    /// Decoder for inbound frames
    pub(crate) decoder: Arc<D>,

    /// Optional header provider for the handshake request
    pub(crate) headers: Option<Arc<dyn HeaderProvider>>,

    /// Optional heartbeat supervision
    pub(crate) heartbeat: Option<Heartbeat>,

    /// Reconnection strategy
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,
}

impl<D> SocketConfig<D>
where
    D: MessageDecoder,
{
    pub fn new(url: impl Into<String>, decoder: D) -> Self {
        Self {
            url: url.into(),
            decoder: Arc::new(decoder),
            headers: None,
            heartbeat: None,
            reconnect_strategy: Box::new(ExponentialBackoff::new(
                Duration::from_secs(1),
                Duration::from_secs(60),
                None,
            )),
        }
    }

    pub fn with_headers(mut self, provider: Arc<dyn HeaderProvider>) -> Self {
        self.headers = Some(provider);
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn with_reconnect_strategy(
        mut self,
        strategy: impl ReconnectionStrategy + 'static,
    ) -> Self {
        self.reconnect_strategy = Box::new(strategy);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn has_heartbeat(&self) -> bool {
        self.heartbeat.is_some()
    }
}
