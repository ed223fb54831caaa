//! # FeedSock
//!
//! A persistent WebSocket client for market-data feeds.
//!
//! ## Features
//!
//! - **Automatic reconnection**: pluggable backoff strategies, with every
//!   registered subscription replayed in order on each reconnect
//! - **Heartbeat supervision**: periodic pings with pong tracking; a silent
//!   connection is torn down and rebuilt
//! - **Typed decoding**: a `MessageDecoder` turns raw frames into your
//!   message type, delivered to the consumer as one ordered sequence
//! - **Handshake headers**: async `HeaderProvider` for signed handshakes
//! - **Lock-free state**: atomic connection state and metrics

pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    client::{SocketClient, SocketEvent, SubscriptionHandle},
    config::{Heartbeat, SocketConfig},
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    pong_tracker::PongTracker,
};

/// Type alias for Result with FeedSockError
pub type Result<T> = std::result::Result<T, traits::FeedSockError>;
