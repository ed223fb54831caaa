//! Client configuration.
//!
//! Everything is simple value injection: credential source, endpoint
//! selection (production vs demo), timeout, and retry budget.

use crate::error::{KalshiError, Result};
use std::time::Duration;

pub const PROD_API_BASE: &str = "https://api.elections.kalshi.com/trade-api/v2";
pub const DEMO_API_BASE: &str = "https://demo-api.kalshi.co/trade-api/v2";
pub const PROD_WS_URL: &str = "wss://api.elections.kalshi.com/trade-api/ws/v2";
pub const DEMO_WS_URL: &str = "wss://demo-api.kalshi.co/trade-api/ws/v2";

#[derive(Debug, Clone)]
pub struct KalshiConfig {
    /// API key identifier, sent with every signed request
    pub api_key_id: String,
    /// Path to the RSA private key PEM file
    pub private_key_path: String,
    /// REST base URL, including the API base path
    pub api_base: String,
    /// WebSocket endpoint URL
    pub ws_url: String,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Retries for transient failures (0 disables retrying)
    pub max_retries: u32,
}

impl KalshiConfig {
    /// Production configuration with default timeout and retries
    pub fn new(api_key_id: impl Into<String>, private_key_path: impl Into<String>) -> Self {
        Self {
            api_key_id: api_key_id.into(),
            private_key_path: private_key_path.into(),
            api_base: PROD_API_BASE.to_string(),
            ws_url: PROD_WS_URL.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    /// Demo-environment configuration
    pub fn demo(api_key_id: impl Into<String>, private_key_path: impl Into<String>) -> Self {
        Self {
            api_base: DEMO_API_BASE.to_string(),
            ws_url: DEMO_WS_URL.to_string(),
            ..Self::new(api_key_id, private_key_path)
        }
    }

    /// Load configuration from the environment.
    ///
    /// Reads a `.env` file first, then `KALSHI_API_KEY_ID` and
    /// `KALSHI_PRIVATE_KEY_PATH` (required), `KALSHI_DEMO=true` for the
    /// demo environment, and optional `KALSHI_API_BASE` / `KALSHI_WS_URL`
    /// overrides.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_key_id = std::env::var("KALSHI_API_KEY_ID").map_err(|_| {
            KalshiError::Configuration(
                "API key ID required. Set KALSHI_API_KEY_ID env var.".to_string(),
            )
        })?;
        let private_key_path = std::env::var("KALSHI_PRIVATE_KEY_PATH").map_err(|_| {
            KalshiError::Configuration(
                "Private key path required. Set KALSHI_PRIVATE_KEY_PATH env var.".to_string(),
            )
        })?;

        let demo = std::env::var("KALSHI_DEMO")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let mut config = if demo {
            Self::demo(api_key_id, private_key_path)
        } else {
            Self::new(api_key_id, private_key_path)
        };

        if let Ok(base) = std::env::var("KALSHI_API_BASE") {
            config.api_base = base;
        }
        if let Ok(url) = std::env::var("KALSHI_WS_URL") {
            config.ws_url = url;
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Path portion of the REST base URL (e.g. `/trade-api/v2`).
    ///
    /// Signed material covers the full path, so endpoints are prefixed
    /// with this before signing.
    pub fn api_path(&self) -> String {
        match self.api_base.splitn(4, '/').nth(3) {
            Some(path) => format!("/{}", path),
            None => String::new(),
        }
    }

    /// Path portion of the WebSocket URL (the handshake is signed too)
    pub fn ws_path(&self) -> String {
        match self.ws_url.splitn(4, '/').nth(3) {
            Some(path) => format!("/{}", path),
            None => String::new(),
        }
    }
}
