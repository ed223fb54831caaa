//! Infrastructure: the HTTP/WebSocket clients and logging setup.

pub mod client;
pub mod logging;
