//! Authenticated venue client.
//!
//! Split into focused modules:
//! - `sign`: request signing
//! - `rest`: the retrying request executor and pagination
//! - `rate_limit`: optional client-side throttling
//! - `markets` / `portfolio` / `exchange`: the REST surface
//! - `feed`: the real-time WebSocket feed and order-book engine

pub mod exchange;
pub mod feed;
pub mod markets;
pub mod portfolio;
pub mod rate_limit;
pub mod rest;
pub mod sign;

use crate::config::KalshiConfig;
use crate::error::Result;
use rate_limit::RateLimiter;
use sign::RequestSigner;
use std::sync::Arc;
use std::time::Duration;

/// Authenticated client for the Kalshi Trading API.
///
/// Construction loads the signing key; a bad or missing key fails here
/// rather than on the first request. The client is cheap to share:
/// concurrent calls share only the signer (read-only) and the optional
/// rate limiter.
///
/// ```rust,ignore
/// let client = KalshiClient::from_env()?;
/// let markets = client.get_markets(&MarketsQuery::default()).await?;
/// ```
pub struct KalshiClient {
    pub(crate) config: KalshiConfig,
    pub(crate) signer: Arc<RequestSigner>,
    pub(crate) http: reqwest::Client,
    pub(crate) rate_limiter: Option<Arc<dyn RateLimiter>>,
}

impl KalshiClient {
    pub fn new(config: KalshiConfig) -> Result<Self> {
        let signer = Arc::new(RequestSigner::from_key_file(
            config.api_key_id.clone(),
            &config.private_key_path,
            config.api_path(),
        )?);

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            config,
            signer,
            http,
            rate_limiter: None,
        })
    }

    /// Create a client from environment variables (loads `.env` first)
    pub fn from_env() -> Result<Self> {
        Self::new(KalshiConfig::from_env()?)
    }

    /// Attach a client-side rate limiter
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn config(&self) -> &KalshiConfig {
        &self.config
    }

    /// Open a new real-time data feed.
    ///
    /// Each call creates a new connection; use a single feed for all
    /// subscriptions.
    pub async fn feed(&self) -> Result<feed::Feed> {
        feed::Feed::connect(&self.config, Arc::clone(&self.signer)).await
    }
}
