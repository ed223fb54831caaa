use serde::{Deserialize, Serialize};

/// The two complementary outcomes of a market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Yes => "yes",
            Side::No => "no",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Limit => "limit",
            OrderType::Market => "market",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Resting,
    Canceled,
    Filled,
    Executed,
    Pending,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Resting => "resting",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Filled => "filled",
            OrderStatus::Executed => "executed",
            OrderStatus::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Closed,
    Settled,
    Active,
    Finalized,
}

impl MarketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketStatus::Open => "open",
            MarketStatus::Closed => "closed",
            MarketStatus::Settled => "settled",
            MarketStatus::Active => "active",
            MarketStatus::Finalized => "finalized",
        }
    }
}

/// Order time-in-force options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Good till canceled (default)
    Gtc,
    /// Immediate or cancel - fill what you can, cancel the rest
    Ioc,
    /// Fill or kill - fill entirely or cancel entirely
    Fok,
}

impl TimeInForce {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeInForce::Gtc => "gtc",
            TimeInForce::Ioc => "ioc",
            TimeInForce::Fok => "fok",
        }
    }
}

/// Self-trade prevention behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelfTradePrevention {
    /// Cancel the resting order on self-cross
    #[serde(rename = "cancel_resting")]
    CancelTaker,
    /// Cancel the incoming order on self-cross
    #[serde(rename = "cancel_aggressing")]
    CancelMaker,
}

impl SelfTradePrevention {
    pub fn as_str(self) -> &'static str {
        match self {
            SelfTradePrevention::CancelTaker => "cancel_resting",
            SelfTradePrevention::CancelMaker => "cancel_aggressing",
        }
    }
}

/// Candlestick period intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandlestickPeriod {
    OneMinute,
    OneHour,
    OneDay,
}

impl CandlestickPeriod {
    /// Interval length in minutes, as the API expects it
    pub fn minutes(self) -> u32 {
        match self {
            CandlestickPeriod::OneMinute => 1,
            CandlestickPeriod::OneHour => 60,
            CandlestickPeriod::OneDay => 1440,
        }
    }
}
