//! Pong response tracker.
//!
//! Tracks pong frames to detect dead/zombie WebSocket connections. A
//! connection is unhealthy if no pong arrives within the configured
//! timeout after a ping was sent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Tracks pong responses to detect dead connections.
///
/// Timestamps are stored as milliseconds since an internal epoch so the
/// tracker can be shared across tasks with plain atomic loads.
pub struct PongTracker {
    epoch: Instant,
    /// Last ping sent (ms since epoch)
    last_ping_sent_ms: AtomicU64,
    /// Last pong received (ms since epoch)
    last_pong_received_ms: AtomicU64,
    timeout: Duration,
}

impl PongTracker {
    /// # Arguments
    /// * `timeout` - how long to wait for a pong after a ping before the
    ///   connection counts as dead (recommended: 3x heartbeat interval)
    pub fn new(timeout: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            last_ping_sent_ms: AtomicU64::new(0),
            last_pong_received_ms: AtomicU64::new(0),
            timeout,
        }
    }

    /// Record that a ping was just sent
    pub fn record_ping_sent(&self) {
        let ms = self.epoch.elapsed().as_millis() as u64;
        self.last_ping_sent_ms.store(ms, Ordering::Release);
    }

    /// Record that a pong was just received
    pub fn record_pong_received(&self) {
        let ms = self.epoch.elapsed().as_millis() as u64;
        self.last_pong_received_ms.store(ms, Ordering::Release);
    }

    /// Check if the connection appears healthy.
    ///
    /// Healthy when no ping has been sent yet, when a pong arrived after
    /// the last ping, or when the timeout has not yet elapsed since the
    /// last ping.
    pub fn is_healthy(&self) -> bool {
        let ping_ms = self.last_ping_sent_ms.load(Ordering::Acquire);
        let pong_ms = self.last_pong_received_ms.load(Ordering::Acquire);

        if ping_ms == 0 {
            return true;
        }

        if pong_ms >= ping_ms {
            return true;
        }

        let now_ms = self.epoch.elapsed().as_millis() as u64;
        now_ms.saturating_sub(ping_ms) < self.timeout.as_millis() as u64
    }

    /// Time since the last pong, or None if none was ever received
    pub fn time_since_last_pong(&self) -> Option<Duration> {
        let pong_ms = self.last_pong_received_ms.load(Ordering::Acquire);
        if pong_ms == 0 {
            return None;
        }
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        Some(Duration::from_millis(now_ms.saturating_sub(pong_ms)))
    }

    /// Reset the tracker state. Call when reconnecting to start fresh.
    pub fn reset(&self) {
        self.last_ping_sent_ms.store(0, Ordering::Release);
        self.last_pong_received_ms.store(0, Ordering::Release);
    }
}
