//! Market, event, series, trade, and candlestick queries.

use super::KalshiClient;
use crate::domain::enums::{CandlestickPeriod, MarketStatus};
use crate::domain::models::{
    CandlestickResponse, Event, Market, OrderbookResponse, Series, Trade,
};
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Pull a nested object out of a response, falling back to the whole
/// response when the key is absent.
pub(crate) fn extract<T: DeserializeOwned>(mut response: Value, key: &str) -> Result<T> {
    let data = match response.get_mut(key) {
        Some(value) => value.take(),
        None => response,
    };
    Ok(serde_json::from_value(data)?)
}

pub(crate) fn parse_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(Into::into))
        .collect()
}

fn normalize(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// Filters for market searches
#[derive(Debug, Default, Clone)]
pub struct MarketsQuery {
    pub status: Option<MarketStatus>,
    pub tickers: Option<Vec<String>>,
    pub series_ticker: Option<String>,
    pub event_ticker: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    /// Follow cursors until the venue reports no more pages
    pub fetch_all: bool,
}

#[derive(Debug, Default, Clone)]
pub struct EventsQuery {
    pub status: Option<MarketStatus>,
    pub series_ticker: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub fetch_all: bool,
}

#[derive(Debug, Default, Clone)]
pub struct SeriesQuery {
    pub category: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub fetch_all: bool,
}

#[derive(Debug, Default, Clone)]
pub struct TradesQuery {
    pub ticker: Option<String>,
    pub min_ts: Option<i64>,
    pub max_ts: Option<i64>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub fetch_all: bool,
}

impl KalshiClient {
    /// Get a market by ticker
    pub async fn get_market(&self, ticker: &str) -> Result<Market> {
        let response = self.get(&format!("/markets/{}", normalize(ticker))).await?;
        extract(response, "market")
    }

    /// Search for markets
    pub async fn get_markets(&self, query: &MarketsQuery) -> Result<Vec<Market>> {
        let params = [
            ("status", query.status.map(|s| s.as_str().to_string())),
            ("tickers", query.tickers.as_ref().map(|t| t.join(","))),
            ("series_ticker", query.series_ticker.as_deref().map(normalize)),
            ("event_ticker", query.event_ticker.as_deref().map(normalize)),
            ("limit", Some(query.limit.unwrap_or(100).to_string())),
            ("cursor", query.cursor.clone()),
        ];
        let data = self
            .paginated_get("/markets", "markets", &params, query.fetch_all)
            .await?;
        debug!("Fetched {} markets", data.len());
        parse_items(data)
    }

    /// Get an event by ticker
    pub async fn get_event(&self, event_ticker: &str, with_nested_markets: bool) -> Result<Event> {
        let mut endpoint = format!("/events/{}", normalize(event_ticker));
        if with_nested_markets {
            endpoint.push_str("?with_nested_markets=true");
        }
        let response = self.get(&endpoint).await?;
        extract(response, "event")
    }

    /// Search for events
    pub async fn get_events(&self, query: &EventsQuery) -> Result<Vec<Event>> {
        let params = [
            ("limit", Some(query.limit.unwrap_or(100).to_string())),
            ("series_ticker", query.series_ticker.as_deref().map(normalize)),
            ("status", query.status.map(|s| s.as_str().to_string())),
            ("cursor", query.cursor.clone()),
        ];
        let data = self
            .paginated_get("/events", "events", &params, query.fetch_all)
            .await?;
        parse_items(data)
    }

    /// Get a series by ticker
    pub async fn get_series(&self, series_ticker: &str) -> Result<Series> {
        let response = self
            .get(&format!("/series/{}", normalize(series_ticker)))
            .await?;
        extract(response, "series")
    }

    /// List all series
    pub async fn get_all_series(&self, query: &SeriesQuery) -> Result<Vec<Series>> {
        let params = [
            ("limit", Some(query.limit.unwrap_or(100).to_string())),
            ("category", query.category.clone()),
            ("cursor", query.cursor.clone()),
        ];
        let data = self
            .paginated_get("/series", "series", &params, query.fetch_all)
            .await?;
        parse_items(data)
    }

    /// Get public trade history
    pub async fn get_trades(&self, query: &TradesQuery) -> Result<Vec<Trade>> {
        let params = [
            ("limit", Some(query.limit.unwrap_or(100).to_string())),
            ("ticker", query.ticker.as_deref().map(normalize)),
            ("min_ts", query.min_ts.map(|ts| ts.to_string())),
            ("max_ts", query.max_ts.map(|ts| ts.to_string())),
            ("cursor", query.cursor.clone()),
        ];
        let data = self
            .paginated_get("/markets/trades", "trades", &params, query.fetch_all)
            .await?;
        parse_items(data)
    }

    /// Get a point-in-time order book snapshot over REST
    pub async fn get_orderbook(&self, ticker: &str, depth: Option<u32>) -> Result<OrderbookResponse> {
        let mut endpoint = format!("/markets/{}/orderbook", normalize(ticker));
        if let Some(depth) = depth {
            endpoint.push_str(&format!("?depth={}", depth));
        }
        let response = self.get(&endpoint).await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Batch fetch candlesticks for up to 100 markets, keyed by ticker
    pub async fn get_candlesticks_batch(
        &self,
        tickers: &[&str],
        start_ts: i64,
        end_ts: i64,
        period: CandlestickPeriod,
    ) -> Result<HashMap<String, CandlestickResponse>> {
        let normalized: Vec<String> = tickers.iter().map(|t| normalize(t)).collect();
        let endpoint = format!(
            "/markets/candlesticks?market_tickers={}&start_ts={}&end_ts={}&period_interval={}",
            normalized.join(","),
            start_ts,
            end_ts,
            period.minutes()
        );
        let response = self.get(&endpoint).await?;

        let mut result = HashMap::new();
        if let Some(markets) = response.get("markets").and_then(Value::as_array) {
            for item in markets {
                let parsed: CandlestickResponse = serde_json::from_value(item.clone())?;
                let key = parsed
                    .market_ticker
                    .clone()
                    .or_else(|| parsed.ticker.clone())
                    .unwrap_or_default();
                result.insert(key, parsed);
            }
        }
        Ok(result)
    }
}
