//! Atomic connection state and metrics.
//!
//! State is stored in a single `AtomicU8` so the connection task, the
//! consumer, and any monitoring thread can read it without locks.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Connection lifecycle states.
///
/// ```text
/// Disconnected → Connecting → Connected → Subscribing → Active
///                     ↑                                    │
///                     └────────── Reconnecting ←───────────┘
/// ```
///
/// `ShuttingDown` is terminal: an explicit close never auto-reconnects.
/// `Subscribing`/`Active` are driven by the protocol layer on top of the
/// socket (the socket itself cannot see subscription acknowledgments).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Subscribing = 3,
    Active = 4,
    Reconnecting = 5,
    ShuttingDown = 6,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Subscribing,
            4 => ConnectionState::Active,
            5 => ConnectionState::Reconnecting,
            6 => ConnectionState::ShuttingDown,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Lock-free holder for the current `ConnectionState`.
pub struct AtomicConnectionState {
    state: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(initial: ConnectionState) -> Self {
        Self {
            state: AtomicU8::new(initial as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_disconnected(&self) -> bool {
        self.get() == ConnectionState::Disconnected
    }

    /// True while the transport handshake has succeeded (any of
    /// Connected/Subscribing/Active).
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(
            self.get(),
            ConnectionState::Connected | ConnectionState::Subscribing | ConnectionState::Active
        )
    }

    /// True while a connection attempt is in flight
    #[inline]
    pub fn is_connecting(&self) -> bool {
        matches!(
            self.get(),
            ConnectionState::Connecting | ConnectionState::Reconnecting
        )
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.get() == ConnectionState::Active
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.get() == ConnectionState::ShuttingDown
    }
}

/// Atomic counters for connection activity.
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            reconnect_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }
}

impl Default for AtomicMetrics {
    fn default() -> Self {
        Self::new()
    }
}
