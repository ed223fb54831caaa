use async_trait::async_trait;

/// HTTP headers applied to the WebSocket handshake request.
pub type Headers = Vec<(String, String)>;

/// Trait for providing handshake headers.
///
/// Called on every connection attempt, so providers that sign with a
/// timestamp produce a fresh signature for each reconnect.
#[async_trait]
pub trait HeaderProvider: Send + Sync {
    async fn get_headers(&self) -> Headers;
}

/// A provider that adds no headers
pub struct NoHeaders;

#[async_trait]
impl HeaderProvider for NoHeaders {
    async fn get_headers(&self) -> Headers {
        Vec::new()
    }
}
