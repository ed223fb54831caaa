//! Stream live order books for one or more markets.
//!
//! Usage: stream_orderbook TICKER [TICKER...]
//!
//! Requires KALSHI_API_KEY_ID and KALSHI_PRIVATE_KEY_PATH (a `.env` file
//! works).

use anyhow::Result;
use kalshi::{init_tracing, FeedMessage, KalshiClient, OrderbookManager, Side};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let tickers: Vec<String> = std::env::args().skip(1).collect();
    if tickers.is_empty() {
        anyhow::bail!("usage: stream_orderbook TICKER [TICKER...]");
    }
    let ticker_refs: Vec<&str> = tickers.iter().map(String::as_str).collect();

    let client = KalshiClient::from_env()?;
    let mut feed = client.feed().await?;
    feed.subscribe_orderbook(&ticker_refs).await?;
    feed.subscribe_ticker(&ticker_refs).await?;
    info!("Streaming {} markets", tickers.len());

    let mut books = OrderbookManager::new();
    loop {
        let message = feed.next().await?;
        books.apply(&message);

        let ticker = match &message {
            FeedMessage::Snapshot(snapshot) => snapshot.market_ticker.clone(),
            FeedMessage::Delta(delta) => delta.market_ticker.clone(),
            FeedMessage::Ticker(ticker) => {
                info!(
                    "{}: last {:?} ({:?}/{:?})",
                    ticker.market_ticker, ticker.price, ticker.yes_bid, ticker.yes_ask
                );
                continue;
            }
            _ => continue,
        };

        match books.book(&ticker) {
            Ok(Some(book)) => info!(
                "{}: bid {:?} ask {:?} mid {:?} imbalance {:?}",
                ticker,
                book.best_bid(Side::Yes),
                book.best_ask(Side::Yes),
                book.mid(),
                book.imbalance()
            ),
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }
    }
}
