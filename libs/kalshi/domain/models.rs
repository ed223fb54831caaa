//! Typed records for venue objects.
//!
//! Every field the venue documents is declared explicitly; unknown JSON
//! keys are ignored during decoding. Prices and money amounts are integer
//! cents unless a field name says otherwise.

use super::enums::{Action, MarketStatus, OrderStatus, OrderType, Side};
use super::orderbook::OrderBook;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub ticker: String,
    pub event_ticker: Option<String>,
    pub series_ticker: Option<String>,
    pub market_type: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub yes_sub_title: Option<String>,
    pub no_sub_title: Option<String>,

    // Timing
    pub open_time: Option<DateTime<Utc>>,
    pub close_time: Option<DateTime<Utc>>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub expected_expiration_time: Option<DateTime<Utc>>,
    pub latest_expiration_time: Option<DateTime<Utc>>,
    pub created_time: Option<DateTime<Utc>>,
    pub updated_time: Option<DateTime<Utc>>,

    // Status & result
    pub status: Option<MarketStatus>,
    pub result: Option<String>,
    pub settlement_value: Option<i64>,

    // Pricing
    pub yes_bid: Option<i64>,
    pub yes_ask: Option<i64>,
    pub no_bid: Option<i64>,
    pub no_ask: Option<i64>,
    pub last_price: Option<i64>,
    pub previous_yes_bid: Option<i64>,
    pub previous_yes_ask: Option<i64>,
    pub previous_price: Option<i64>,
    pub notional_value: Option<i64>,

    // Volume & liquidity
    pub volume: Option<i64>,
    pub volume_24h: Option<i64>,
    pub open_interest: Option<i64>,
    pub liquidity: Option<i64>,

    // Market structure
    pub tick_size: Option<i64>,
    pub strike_type: Option<String>,
    pub can_close_early: Option<bool>,
    pub rules_primary: Option<String>,
    pub rules_secondary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_ticker: String,
    pub series_ticker: Option<String>,
    pub title: Option<String>,
    pub sub_title: Option<String>,
    pub category: Option<String>,

    #[serde(default)]
    pub mutually_exclusive: bool,
    pub collateral_return_type: Option<String>,

    pub strike_date: Option<DateTime<Utc>>,
    pub strike_period: Option<String>,

    #[serde(default)]
    pub available_on_brokers: bool,

    /// Populated when the event is fetched with nested markets
    pub markets: Option<Vec<Market>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub ticker: String,
    pub title: Option<String>,
    pub category: Option<String>,
    pub frequency: Option<String>,
    pub tags: Option<Vec<String>>,
    pub contract_url: Option<String>,
    pub volume: Option<i64>,
}

/// A public trade (someone else's execution)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub ticker: String,
    pub count: i64,
    pub yes_price: i64,
    pub no_price: i64,
    pub taker_side: Option<Side>,
    pub created_time: Option<DateTime<Utc>>,
    pub ts: Option<i64>,
}

// --- Candlesticks ---

/// OHLC price data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcData {
    pub open: Option<i64>,
    pub high: Option<i64>,
    pub low: Option<i64>,
    pub close: Option<i64>,
}

/// Price data with summary fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceData {
    pub open: Option<i64>,
    pub high: Option<i64>,
    pub low: Option<i64>,
    pub close: Option<i64>,
    pub max: Option<i64>,
    pub min: Option<i64>,
    pub mean: Option<i64>,
    pub previous: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candlestick {
    pub end_period_ts: i64,
    pub volume: i64,
    pub open_interest: i64,
    pub price: PriceData,
    pub yes_bid: Option<OhlcData>,
    pub yes_ask: Option<OhlcData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandlestickResponse {
    pub ticker: Option<String>,
    pub market_ticker: Option<String>,
    #[serde(default)]
    pub candlesticks: Vec<Candlestick>,
}

// --- REST orderbook ---

/// Raw orderbook arrays as the REST endpoint returns them:
/// `[[price, quantity], ...]` per side
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOrderbook {
    pub yes: Option<Vec<(i64, i64)>>,
    pub no: Option<Vec<(i64, i64)>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookResponse {
    pub orderbook: RawOrderbook,
}

impl OrderbookResponse {
    /// Convert into an [`OrderBook`] for analytics
    pub fn into_book(self) -> OrderBook {
        OrderBook::from_snapshot(
            self.orderbook.yes.as_deref().unwrap_or(&[]),
            self.orderbook.no.as_deref().unwrap_or(&[]),
        )
    }
}

// --- Portfolio ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub ticker: String,
    pub status: OrderStatus,
    pub action: Option<Action>,
    pub side: Option<Side>,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,

    // Pricing
    pub yes_price: Option<i64>,
    pub no_price: Option<i64>,

    // Counts
    pub initial_count: Option<i64>,
    pub fill_count: Option<i64>,
    pub remaining_count: Option<i64>,

    // Fees & costs (cents)
    pub taker_fees: Option<i64>,
    pub maker_fees: Option<i64>,
    pub taker_fill_cost: Option<i64>,
    pub maker_fill_cost: Option<i64>,

    // Metadata
    pub user_id: Option<String>,
    pub client_order_id: Option<String>,
    pub order_group_id: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub last_update_time: Option<DateTime<Utc>>,
    pub expiration_time: Option<DateTime<Utc>>,
}

/// Portfolio balance. Values are in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub balance: i64,
    pub portfolio_value: Option<i64>,
    pub updated_ts: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    /// Net position (positive = yes, negative = no)
    pub position: i64,
    pub market_exposure: Option<i64>,
    pub total_traded: Option<i64>,
    pub resting_orders_count: Option<i64>,
    pub fees_paid: Option<i64>,
    pub realized_pnl: Option<i64>,
    pub last_updated_ts: Option<String>,
}

/// An execution against one of our orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub trade_id: String,
    pub ticker: String,
    pub order_id: String,
    pub side: Side,
    pub action: Action,
    pub count: i64,
    pub yes_price: i64,
    pub no_price: i64,
    pub is_taker: Option<bool>,
    pub fill_id: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub ts: Option<i64>,
}

/// Settlement record for a resolved position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub ticker: String,
    pub market_result: Option<String>,
    pub yes_count: Option<i64>,
    pub yes_total_cost: Option<i64>,
    pub no_count: Option<i64>,
    pub no_total_cost: Option<i64>,
    pub revenue: Option<i64>,
    pub settled_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderGroup {
    pub order_group_id: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub order_ids: Vec<String>,
    pub contracts_matched: Option<i64>,
    pub max_profit: Option<i64>,
    pub max_loss: Option<i64>,
    pub is_triggered: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePosition {
    pub order_id: String,
    /// 0-indexed position at the order's price level; 0 = first in line
    #[serde(default)]
    pub queue_position: i64,
}

// --- Subaccounts ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subaccount {
    pub subaccount_id: Option<String>,
    pub subaccount_number: Option<i64>,
    pub created_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubaccountBalance {
    pub subaccount_id: Option<String>,
    pub subaccount_number: Option<i64>,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubaccountTransfer {
    pub transfer_id: Option<String>,
    pub from_subaccount_id: Option<String>,
    pub to_subaccount_id: Option<String>,
    pub amount: i64,
    pub created_time: Option<DateTime<Utc>>,
}

// --- Exchange ---

/// Exchange operational status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeStatus {
    pub exchange_active: bool,
    pub trading_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: Option<String>,
    pub title: String,
    pub body: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub open_time: Option<String>,
    pub close_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeSchedule {
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}
