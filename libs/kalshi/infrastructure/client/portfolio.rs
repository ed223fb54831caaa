//! Portfolio and trading operations: balance, orders, fills, positions,
//! settlements, order groups, and subaccounts.

use super::markets::{extract, parse_items};
use super::KalshiClient;
use crate::domain::enums::{Action, OrderStatus, OrderType, SelfTradePrevention, Side, TimeInForce};
use crate::domain::models::{
    Balance, Fill, Order, OrderGroup, Position, QueuePosition, Settlement, Subaccount,
    SubaccountBalance, SubaccountTransfer,
};
use crate::error::{KalshiError, Result};
use serde_json::{json, Value};

/// A new order to submit.
///
/// Exactly one of `yes_price`/`no_price` may be set; a `no_price` is
/// converted to its complementary `yes_price` before submission. Limit
/// orders require a price.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub ticker: String,
    pub action: Action,
    pub side: Side,
    pub count: i64,
    pub order_type: OrderType,
    pub yes_price: Option<i64>,
    pub no_price: Option<i64>,
    /// Idempotency key: resubmitting returns the existing order
    pub client_order_id: Option<String>,
    pub time_in_force: Option<TimeInForce>,
    /// Reject the order if it would take liquidity
    pub post_only: bool,
    /// Only reduce an existing position, never increase
    pub reduce_only: bool,
    /// Unix timestamp when the order auto-cancels
    pub expiration_ts: Option<i64>,
    /// Maximum total cost in cents, as slippage protection
    pub buy_max_cost: Option<i64>,
    pub self_trade_prevention: Option<SelfTradePrevention>,
    /// Link to an order group for OCO/bracket strategies
    pub order_group_id: Option<String>,
}

impl NewOrder {
    pub fn limit(
        ticker: impl Into<String>,
        action: Action,
        side: Side,
        count: i64,
        yes_price: i64,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            yes_price: Some(yes_price),
            ..Self::market(ticker, action, side, count)
        }
    }

    pub fn market(ticker: impl Into<String>, action: Action, side: Side, count: i64) -> Self {
        Self {
            ticker: ticker.into(),
            action,
            side,
            count,
            order_type: OrderType::Market,
            yes_price: None,
            no_price: None,
            client_order_id: None,
            time_in_force: None,
            post_only: false,
            reduce_only: false,
            expiration_ts: None,
            buy_max_cost: None,
            self_trade_prevention: None,
            order_group_id: None,
        }
    }

    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }

    pub fn post_only(mut self) -> Self {
        self.post_only = true;
        self
    }

    pub(crate) fn to_body(&self) -> Result<Value> {
        if self.yes_price.is_some() && self.no_price.is_some() {
            return Err(KalshiError::InvalidRequest(
                "Specify yes_price or no_price, not both".to_string(),
            ));
        }

        // Complementary pricing: a NO price is just 100 - yes
        let yes_price = self.no_price.map(|p| 100 - p).or(self.yes_price);

        if yes_price.is_none() && self.order_type == OrderType::Limit {
            return Err(KalshiError::InvalidRequest(
                "Limit orders require yes_price or no_price".to_string(),
            ));
        }

        let mut body = json!({
            "ticker": self.ticker,
            "action": self.action.as_str(),
            "side": self.side.as_str(),
            "count": self.count,
            "type": self.order_type.as_str(),
        });
        let fields = body.as_object_mut().expect("body is an object");
        if let Some(price) = yes_price {
            fields.insert("yes_price".to_string(), json!(price));
        }
        if let Some(ref id) = self.client_order_id {
            fields.insert("client_order_id".to_string(), json!(id));
        }
        if let Some(tif) = self.time_in_force {
            fields.insert("time_in_force".to_string(), json!(tif.as_str()));
        }
        if self.post_only {
            fields.insert("post_only".to_string(), json!(true));
        }
        if self.reduce_only {
            fields.insert("reduce_only".to_string(), json!(true));
        }
        if let Some(ts) = self.expiration_ts {
            fields.insert("expiration_ts".to_string(), json!(ts));
        }
        if let Some(cost) = self.buy_max_cost {
            fields.insert("buy_max_cost".to_string(), json!(cost));
        }
        if let Some(stp) = self.self_trade_prevention {
            fields.insert(
                "self_trade_prevention_type".to_string(),
                json!(stp.as_str()),
            );
        }
        if let Some(ref group) = self.order_group_id {
            fields.insert("order_group_id".to_string(), json!(group));
        }
        Ok(body)
    }
}

#[derive(Debug, Default, Clone)]
pub struct OrdersQuery {
    pub status: Option<OrderStatus>,
    pub ticker: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub fetch_all: bool,
}

#[derive(Debug, Default, Clone)]
pub struct PositionsQuery {
    pub ticker: Option<String>,
    pub event_ticker: Option<String>,
    /// Filter to non-zero values: "position", "total_traded", or both
    /// comma-separated
    pub count_filter: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub fetch_all: bool,
}

#[derive(Debug, Default, Clone)]
pub struct FillsQuery {
    pub ticker: Option<String>,
    pub order_id: Option<String>,
    pub min_ts: Option<i64>,
    pub max_ts: Option<i64>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub fetch_all: bool,
}

#[derive(Debug, Default, Clone)]
pub struct SettlementsQuery {
    pub ticker: Option<String>,
    pub event_ticker: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub fetch_all: bool,
}

impl KalshiClient {
    /// Get portfolio balance. Values are in cents.
    pub async fn get_balance(&self) -> Result<Balance> {
        let response = self.get("/portfolio/balance").await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Place an order
    pub async fn place_order(&self, order: &NewOrder) -> Result<Order> {
        let body = order.to_body()?;
        let response = self.post("/portfolio/orders", body).await?;
        extract(response, "order")
    }

    /// Cancel a resting order, returning it with updated status
    pub async fn cancel_order(&self, order_id: &str) -> Result<Order> {
        let response = self.delete(&format!("/portfolio/orders/{}", order_id)).await?;
        extract(response, "order")
    }

    /// Amend a resting order's price or count
    pub async fn amend_order(
        &self,
        order_id: &str,
        count: Option<i64>,
        yes_price: Option<i64>,
        no_price: Option<i64>,
    ) -> Result<Order> {
        if yes_price.is_some() && no_price.is_some() {
            return Err(KalshiError::InvalidRequest(
                "Specify yes_price or no_price, not both".to_string(),
            ));
        }
        let yes_price = no_price.map(|p| 100 - p).or(yes_price);

        let mut body = serde_json::Map::new();
        if let Some(count) = count {
            body.insert("count".to_string(), json!(count));
        }
        if let Some(price) = yes_price {
            body.insert("yes_price".to_string(), json!(price));
        }
        if body.is_empty() {
            return Err(KalshiError::InvalidRequest(
                "Must specify at least one of count, yes_price, or no_price".to_string(),
            ));
        }

        let response = self
            .post(&format!("/portfolio/orders/{}/amend", order_id), Value::Object(body))
            .await?;
        extract(response, "order")
    }

    /// Decrease the remaining count of a resting order
    pub async fn decrease_order(&self, order_id: &str, reduce_by: i64) -> Result<Order> {
        let response = self
            .post(
                &format!("/portfolio/orders/{}/decrease", order_id),
                json!({ "reduce_by": reduce_by }),
            )
            .await?;
        extract(response, "order")
    }

    /// Get a single order by ID
    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        let response = self.get(&format!("/portfolio/orders/{}", order_id)).await?;
        extract(response, "order")
    }

    /// List orders
    pub async fn get_orders(&self, query: &OrdersQuery) -> Result<Vec<Order>> {
        let params = [
            ("limit", Some(query.limit.unwrap_or(100).to_string())),
            ("status", query.status.map(|s| s.as_str().to_string())),
            ("ticker", query.ticker.clone()),
            ("cursor", query.cursor.clone()),
        ];
        let data = self
            .paginated_get("/portfolio/orders", "orders", &params, query.fetch_all)
            .await?;
        parse_items(data)
    }

    /// Place multiple orders atomically
    pub async fn batch_place_orders(&self, orders: &[NewOrder]) -> Result<Vec<Order>> {
        let bodies = orders
            .iter()
            .map(|o| o.to_body())
            .collect::<Result<Vec<Value>>>()?;
        let response = self
            .post("/portfolio/orders/batched", json!({ "orders": bodies }))
            .await?;
        parse_items(list_field(response, "orders"))
    }

    /// Cancel multiple orders atomically
    pub async fn batch_cancel_orders(&self, order_ids: &[&str]) -> Result<Vec<Order>> {
        let response = self
            .post(
                "/portfolio/orders/batched/cancel",
                json!({ "order_ids": order_ids }),
            )
            .await?;
        parse_items(list_field(response, "orders"))
    }

    /// Get portfolio positions
    pub async fn get_positions(&self, query: &PositionsQuery) -> Result<Vec<Position>> {
        let params = [
            ("limit", Some(query.limit.unwrap_or(100).to_string())),
            ("ticker", query.ticker.clone()),
            ("event_ticker", query.event_ticker.clone()),
            ("count_filter", query.count_filter.clone()),
            ("cursor", query.cursor.clone()),
        ];
        let data = self
            .paginated_get(
                "/portfolio/positions",
                "market_positions",
                &params,
                query.fetch_all,
            )
            .await?;
        parse_items(data)
    }

    /// Get trade fills (our executions)
    pub async fn get_fills(&self, query: &FillsQuery) -> Result<Vec<Fill>> {
        let params = [
            ("limit", Some(query.limit.unwrap_or(100).to_string())),
            ("ticker", query.ticker.clone()),
            ("order_id", query.order_id.clone()),
            ("min_ts", query.min_ts.map(|ts| ts.to_string())),
            ("max_ts", query.max_ts.map(|ts| ts.to_string())),
            ("cursor", query.cursor.clone()),
        ];
        let data = self
            .paginated_get("/portfolio/fills", "fills", &params, query.fetch_all)
            .await?;
        parse_items(data)
    }

    /// Get settlement records for resolved positions
    pub async fn get_settlements(&self, query: &SettlementsQuery) -> Result<Vec<Settlement>> {
        let params = [
            ("limit", Some(query.limit.unwrap_or(100).to_string())),
            ("ticker", query.ticker.clone()),
            ("event_ticker", query.event_ticker.clone()),
            ("cursor", query.cursor.clone()),
        ];
        let data = self
            .paginated_get(
                "/portfolio/settlements",
                "settlements",
                &params,
                query.fetch_all,
            )
            .await?;
        parse_items(data)
    }

    /// Get queue position for a single resting order (0 = first in line)
    pub async fn get_queue_position(&self, order_id: &str) -> Result<QueuePosition> {
        let response = self
            .get(&format!("/portfolio/orders/{}/queue_position", order_id))
            .await?;
        Ok(QueuePosition {
            order_id: order_id.to_string(),
            queue_position: response
                .get("queue_position")
                .and_then(Value::as_i64)
                .unwrap_or(0),
        })
    }

    /// Get queue positions for multiple resting orders
    pub async fn get_queue_positions(&self, order_ids: &[&str]) -> Result<Vec<QueuePosition>> {
        let response = self
            .post(
                "/portfolio/orders/queue_positions",
                json!({ "order_ids": order_ids }),
            )
            .await?;
        parse_items(list_field(response, "queue_positions"))
    }

    // --- Order groups (OCO, bracket orders) ---

    /// Create an order group linking multiple orders
    pub async fn create_order_group(
        &self,
        order_ids: &[&str],
        max_profit: Option<i64>,
        max_loss: Option<i64>,
    ) -> Result<OrderGroup> {
        let mut body = serde_json::Map::new();
        body.insert("order_ids".to_string(), json!(order_ids));
        if let Some(profit) = max_profit {
            body.insert("max_profit".to_string(), json!(profit));
        }
        if let Some(loss) = max_loss {
            body.insert("max_loss".to_string(), json!(loss));
        }

        let response = self
            .post("/portfolio/order_groups", Value::Object(body))
            .await?;
        extract(response, "order_group")
    }

    /// Get an order group by ID
    pub async fn get_order_group(&self, order_group_id: &str) -> Result<OrderGroup> {
        let response = self
            .get(&format!("/portfolio/order_groups/{}", order_group_id))
            .await?;
        extract(response, "order_group")
    }

    /// List all order groups
    pub async fn get_order_groups(
        &self,
        limit: Option<u32>,
        cursor: Option<String>,
        fetch_all: bool,
    ) -> Result<Vec<OrderGroup>> {
        let params = [
            ("limit", Some(limit.unwrap_or(100).to_string())),
            ("cursor", cursor),
        ];
        let data = self
            .paginated_get("/portfolio/order_groups", "order_groups", &params, fetch_all)
            .await?;
        parse_items(data)
    }

    /// Manually trigger an order group
    pub async fn trigger_order_group(&self, order_group_id: &str) -> Result<OrderGroup> {
        let response = self
            .post(
                &format!("/portfolio/order_groups/{}/trigger", order_group_id),
                json!({}),
            )
            .await?;
        extract(response, "order_group")
    }

    /// Reset the matched-contract counter for an order group
    pub async fn reset_order_group(&self, order_group_id: &str) -> Result<OrderGroup> {
        let response = self
            .post(
                &format!("/portfolio/order_groups/{}/reset", order_group_id),
                json!({}),
            )
            .await?;
        extract(response, "order_group")
    }

    /// Update the contract limit for an order group
    pub async fn update_order_group_limit(
        &self,
        order_group_id: &str,
        max_profit: Option<i64>,
        max_loss: Option<i64>,
    ) -> Result<OrderGroup> {
        let mut body = serde_json::Map::new();
        if let Some(profit) = max_profit {
            body.insert("max_profit".to_string(), json!(profit));
        }
        if let Some(loss) = max_loss {
            body.insert("max_loss".to_string(), json!(loss));
        }
        let response = self
            .post(
                &format!("/portfolio/order_groups/{}/limit", order_group_id),
                Value::Object(body),
            )
            .await?;
        extract(response, "order_group")
    }

    /// Delete an order group (does not cancel its orders)
    pub async fn delete_order_group(&self, order_group_id: &str) -> Result<()> {
        self.delete(&format!("/portfolio/order_groups/{}", order_group_id))
            .await?;
        Ok(())
    }

    // --- Subaccounts ---

    /// Create a new numbered subaccount
    pub async fn create_subaccount(&self) -> Result<Subaccount> {
        let response = self.post("/portfolio/subaccounts", json!({})).await?;
        extract(response, "subaccount")
    }

    /// Transfer funds between subaccounts (amount in cents)
    pub async fn transfer_between_subaccounts(
        &self,
        from_subaccount_id: &str,
        to_subaccount_id: &str,
        amount: i64,
    ) -> Result<SubaccountTransfer> {
        let response = self
            .post(
                "/portfolio/subaccounts/transfer",
                json!({
                    "from_subaccount_id": from_subaccount_id,
                    "to_subaccount_id": to_subaccount_id,
                    "amount": amount,
                }),
            )
            .await?;
        extract(response, "transfer")
    }

    /// Get balances for all subaccounts
    pub async fn get_subaccount_balances(&self) -> Result<Vec<SubaccountBalance>> {
        let response = self.get("/portfolio/subaccounts/balances").await?;
        parse_items(list_field(response, "balances"))
    }

    /// Get transfer history between subaccounts
    pub async fn get_subaccount_transfers(
        &self,
        limit: Option<u32>,
        cursor: Option<String>,
        fetch_all: bool,
    ) -> Result<Vec<SubaccountTransfer>> {
        let params = [
            ("limit", Some(limit.unwrap_or(100).to_string())),
            ("cursor", cursor),
        ];
        let data = self
            .paginated_get(
                "/portfolio/subaccounts/transfers",
                "transfers",
                &params,
                fetch_all,
            )
            .await?;
        parse_items(data)
    }
}

fn list_field(mut response: Value, key: &str) -> Vec<Value> {
    response
        .get_mut(key)
        .and_then(|v| v.as_array_mut())
        .map(std::mem::take)
        .unwrap_or_default()
}
