use thiserror::Error;

/// Main error type for feedsock
#[derive(Error, Debug)]
pub enum FeedSockError {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Message decoding error
    #[error("Decode error: {0}")]
    Decode(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Channel receive error
    #[error("Channel receive error: {0}")]
    ChannelReceive(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Heartbeat timed out without a pong
    #[error("Heartbeat timeout: {0}")]
    HeartbeatTimeout(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for feedsock operations
pub type Result<T> = std::result::Result<T, FeedSockError>;
