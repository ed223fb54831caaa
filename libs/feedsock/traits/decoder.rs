use crate::error::Result;

/// A WebSocket frame as seen by the decoder and the send API.
#[derive(Debug, Clone)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the message as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            WsMessage::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Check if message is text
    pub fn is_text(&self) -> bool {
        matches!(self, WsMessage::Text(_))
    }
}

/// Trait for decoding WebSocket frames into typed messages.
///
/// Decoding runs inline on the connection task so the consumer sees
/// messages in exact arrival order.
///
/// # Returns
/// * `Ok(Some(frame))` - a typed message for the consumer
/// * `Ok(None)` - a frame the consumer should not see (e.g. a keepalive)
/// * `Err(_)` - the frame could not be decoded; it is logged and dropped,
///   never fatal to the connection
pub trait MessageDecoder: Send + Sync + 'static {
    /// The decoded message type
    type Frame: Send + std::fmt::Debug + 'static;

    fn decode(&self, message: WsMessage) -> Result<Option<Self::Frame>>;
}
