//! List open markets.
//!
//! Requires KALSHI_API_KEY_ID and KALSHI_PRIVATE_KEY_PATH (a `.env` file
//! works).

use anyhow::Result;
use kalshi::{init_tracing, KalshiClient, MarketStatus, MarketsQuery};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let client = KalshiClient::from_env()?;
    let query = MarketsQuery {
        status: Some(MarketStatus::Open),
        limit: Some(50),
        ..Default::default()
    };
    let markets = client.get_markets(&query).await?;

    for market in &markets {
        println!(
            "{:<35} {:>3?}/{:<3?}  {}",
            market.ticker,
            market.yes_bid,
            market.yes_ask,
            market.title.as_deref().unwrap_or("-")
        );
    }
    println!("{} markets", markets.len());
    Ok(())
}
