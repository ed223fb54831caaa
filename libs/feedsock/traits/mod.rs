//! Core traits and types for the FeedSock WebSocket client.
//!
//! - **MessageDecoder**: turn raw frames into typed messages
//! - **HeaderProvider**: supply handshake headers (e.g. signed auth)
//! - **ReconnectionStrategy**: control reconnection pacing

pub mod decoder;
pub mod error;
pub mod headers;
pub mod reconnect;

pub use decoder::{MessageDecoder, WsMessage};
pub use error::{FeedSockError, Result};
pub use headers::{HeaderProvider, Headers, NoHeaders};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
