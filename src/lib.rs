//! Kalshi trading client - main library.
//!
//! This crate re-exports the workspace libraries:
//!
//! - **kalshi**: the venue client (REST pipeline, streaming feed,
//!   order-book engine, analytics)
//! - **feedsock**: the underlying WebSocket connection library
//!
//! Binaries in `src/bin/` are thin orchestration over these libraries;
//! they own no retry, signing, or sequencing logic of their own.

pub use feedsock;
pub use kalshi;
