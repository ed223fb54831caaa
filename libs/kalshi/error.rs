//! Error taxonomy shared by the REST pipeline and the streaming half.
//!
//! Transient conditions (connect failures, 5xx, 429) are retried inside
//! the request executor and only surface here after exhaustion. 4xx
//! classification errors surface immediately and are never retried.

use thiserror::Error;

/// Context attached to every classified API error: enough to debug a
/// rejected call without re-deriving the signed request.
#[derive(Debug, Clone)]
pub struct ApiFailure {
    pub status: u16,
    pub message: String,
    pub code: Option<String>,
    pub method: Option<String>,
    pub endpoint: Option<String>,
    pub request_body: Option<serde_json::Value>,
}

impl ApiFailure {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
            method: None,
            endpoint: None,
            request_body: None,
        }
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)?;
        if let Some(code) = &self.code {
            write!(f, " ({})", code)?;
        }
        if let (Some(method), Some(endpoint)) = (&self.method, &self.endpoint) {
            write!(f, " [{} {}]", method, endpoint)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum KalshiError {
    /// Signing key missing, unparseable, or not RSA. Fatal at construction.
    #[error("Failed to load signing key from {path}: {reason}")]
    KeyLoad { path: String, reason: String },

    /// Connection-level failure after retries were exhausted
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 429 after retries were exhausted
    #[error("Rate limited: {0}")]
    RateLimited(ApiFailure),

    /// 401/403
    #[error("Authentication failed: {0}")]
    Authentication(ApiFailure),

    /// 404
    #[error("Resource not found: {0}")]
    NotFound(ApiFailure),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(ApiFailure),

    /// Order refused by the venue (market closed/settled, invalid price,
    /// self-trade, post-only violation)
    #[error("Order rejected: {0}")]
    OrderRejected(ApiFailure),

    /// Catch-all for any other non-2xx response
    #[error("API error: {0}")]
    Api(ApiFailure),

    /// Streaming book missed a sequence number; the book cannot be
    /// queried as authoritative until a fresh snapshot arrives
    #[error("Order book for {ticker} is stale: expected seq {expected}, received {received}")]
    StaleBook {
        ticker: String,
        expected: u64,
        received: u64,
    },

    #[error("Feed error: {0}")]
    Feed(#[from] feedsock::FeedSockError),

    #[error("Deserialization failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl KalshiError {
    /// The API failure context, for classified HTTP errors
    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            KalshiError::RateLimited(f)
            | KalshiError::Authentication(f)
            | KalshiError::NotFound(f)
            | KalshiError::InsufficientFunds(f)
            | KalshiError::OrderRejected(f)
            | KalshiError::Api(f) => Some(f),
            _ => None,
        }
    }

    /// HTTP status of a classified error
    pub fn status(&self) -> Option<u16> {
        self.failure().map(|f| f.status)
    }

    /// Venue error code of a classified error
    pub fn code(&self) -> Option<&str> {
        self.failure().and_then(|f| f.code.as_deref())
    }
}

pub type Result<T> = std::result::Result<T, KalshiError>;
