//! # Kalshi
//!
//! Client library for the Kalshi prediction-market venue.
//!
//! Two halves share an RSA-PSS request signer and one error taxonomy:
//!
//! - **REST**: [`KalshiClient`] signs every request, retries transient
//!   failures with exponential backoff, cooperates with an optional rate
//!   limiter, and follows pagination cursors.
//! - **Streaming**: [`Feed`] maintains a persistent WebSocket with
//!   heartbeat and reconnect-with-resubscribe, and [`OrderbookManager`]
//!   rebuilds per-market order books from snapshot/delta messages with
//!   strict sequence tracking.
//!
//! ```rust,ignore
//! use kalshi::{KalshiClient, OrderbookManager};
//!
//! #[tokio::main]
//! async fn main() -> kalshi::Result<()> {
//!     let client = KalshiClient::from_env()?;
//!     let mut feed = client.feed().await?;
//!     feed.subscribe_orderbook(&["KXBTC-25DEC31"]).await?;
//!
//!     let mut books = OrderbookManager::new();
//!     loop {
//!         let message = feed.next().await?;
//!         books.apply(&message);
//!         if let Some(book) = books.book("KXBTC-25DEC31")? {
//!             println!("mid: {:?}", book.mid());
//!         }
//!     }
//! }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use config::KalshiConfig;
pub use domain::enums::{
    Action, CandlestickPeriod, MarketStatus, OrderStatus, OrderType, SelfTradePrevention, Side,
    TimeInForce,
};
pub use domain::orderbook::OrderBook;
pub use error::{ApiFailure, KalshiError, Result};
pub use infrastructure::client::feed::{
    Channel, Feed, FeedMessage, OrderbookManager, Subscription,
};
pub use infrastructure::client::markets::{EventsQuery, MarketsQuery, SeriesQuery, TradesQuery};
pub use infrastructure::client::portfolio::{
    FillsQuery, NewOrder, OrdersQuery, PositionsQuery, SettlementsQuery,
};
pub use infrastructure::client::rate_limit::{HeaderBudget, RateLimiter};
pub use infrastructure::client::KalshiClient;
pub use infrastructure::logging::init_tracing;
