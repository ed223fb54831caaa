//! Core connection machinery: the client task, its configuration, the
//! atomic state/metrics, and heartbeat supervision.

pub mod client;
pub mod config;
pub mod connection_state;
pub mod heartbeat;
pub mod pong_tracker;

// Re-export main types
pub use client::{Metrics, SocketClient, SocketEvent, SubscriptionHandle};
pub use config::{Heartbeat, SocketConfig};
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use pong_tracker::PongTracker;

// Re-export traits for convenience
pub use crate::traits::*;
