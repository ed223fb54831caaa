//! Exchange status, schedule, and announcements.

use super::markets::parse_items;
use super::KalshiClient;
use crate::domain::models::{Announcement, ExchangeSchedule, ExchangeStatus, ScheduleEntry};
use crate::error::Result;
use serde_json::Value;

impl KalshiClient {
    /// Get current exchange operational status
    pub async fn get_exchange_status(&self) -> Result<ExchangeStatus> {
        let response = self.get("/exchange/status").await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Quick check if trading is currently active
    pub async fn is_trading_active(&self) -> Result<bool> {
        Ok(self.get_exchange_status().await?.trading_active)
    }

    /// Get the exchange trading schedule
    pub async fn get_exchange_schedule(&self) -> Result<ExchangeSchedule> {
        let mut response = self.get("/exchange/schedule").await?;
        let entries: Vec<ScheduleEntry> = match response.get_mut("schedule") {
            Some(schedule) => serde_json::from_value(schedule.take())?,
            None => Vec::new(),
        };
        Ok(ExchangeSchedule { schedule: entries })
    }

    /// Get exchange-wide announcements
    pub async fn get_announcements(&self) -> Result<Vec<Announcement>> {
        let mut response = self.get("/exchange/announcements").await?;
        let items = response
            .get_mut("announcements")
            .and_then(|v| v.as_array_mut())
            .map(std::mem::take)
            .unwrap_or_default();
        parse_items(items)
    }

    /// Get timestamp of the last user data validation (Unix ms)
    pub async fn get_user_data_timestamp(&self) -> Result<i64> {
        let response = self.get("/exchange/user_data_timestamp").await?;
        Ok(response
            .get("user_data_timestamp")
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }
}
