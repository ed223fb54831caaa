//! Client-side rate limiting.
//!
//! A limiter is optional: without one, only server-side 429 handling
//! applies. The provided [`HeaderBudget`] tracks the remaining-request
//! budget and reset time the venue reports in response headers, and makes
//! callers wait out the reset once the budget is exhausted.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Pluggable request throttle consulted before every attempt.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until a request may be sent; returns how long the caller was
    /// delayed.
    async fn acquire(&self) -> Duration;

    /// Observe budget headers from a response.
    fn update_from_headers(&self, remaining: Option<i64>, reset_at: Option<i64>);
}

#[derive(Debug, Default)]
struct BudgetState {
    remaining: Option<i64>,
    reset_at: Option<i64>,
}

/// Budget tracker fed by `X-RateLimit-Remaining` / `X-RateLimit-Reset`
/// response headers (reset is a Unix-seconds epoch).
#[derive(Debug, Default)]
pub struct HeaderBudget {
    state: Mutex<BudgetState>,
}

impl HeaderBudget {
    pub fn new() -> Self {
        Self::default()
    }

    fn now_epoch_secs() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl RateLimiter for HeaderBudget {
    async fn acquire(&self) -> Duration {
        // Compute the wait with the lock released before sleeping
        let wait = {
            let state = self.state.lock();
            match (state.remaining, state.reset_at) {
                (Some(remaining), Some(reset_at)) if remaining <= 0 => {
                    let now = Self::now_epoch_secs();
                    if reset_at > now {
                        Duration::from_secs((reset_at - now) as u64)
                    } else {
                        Duration::ZERO
                    }
                }
                _ => Duration::ZERO,
            }
        };

        if !wait.is_zero() {
            debug!("Rate limit budget exhausted, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
            // The budget resets once the window rolls over
            let mut state = self.state.lock();
            state.remaining = None;
            state.reset_at = None;
        }

        wait
    }

    fn update_from_headers(&self, remaining: Option<i64>, reset_at: Option<i64>) {
        let mut state = self.state.lock();
        if remaining.is_some() {
            state.remaining = remaining;
        }
        if reset_at.is_some() {
            state.reset_at = reset_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_is_free_with_budget_left() {
        let limiter = HeaderBudget::new();
        limiter.update_from_headers(Some(42), Some(HeaderBudget::now_epoch_secs() + 60));
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn acquire_is_free_with_no_observations() {
        let limiter = HeaderBudget::new();
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn acquire_is_free_when_reset_already_passed() {
        let limiter = HeaderBudget::new();
        limiter.update_from_headers(Some(0), Some(HeaderBudget::now_epoch_secs() - 5));
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_out_exhausted_budget() {
        let limiter = HeaderBudget::new();
        limiter.update_from_headers(Some(0), Some(HeaderBudget::now_epoch_secs() + 2));

        let waited = limiter.acquire().await;
        assert!(waited >= Duration::from_secs(1));

        // Budget cleared after the window rolls over
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }
}
