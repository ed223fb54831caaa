//! The request executor: signing, retry with backoff, rate-limiter
//! cooperation, error classification, and cursor pagination.
//!
//! Transient conditions (connect/timeout failures, 429, 5xx) are retried
//! up to `max_retries` times with capped exponential backoff, honoring a
//! server `Retry-After` hint when one is present and parseable. Each
//! attempt is signed fresh. Classification errors (4xx) are never
//! retried.

use super::KalshiClient;
use crate::error::{ApiFailure, KalshiError, Result};
use reqwest::{Method, Response};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Backoff before retry `attempt` (0-indexed): a parseable server hint
/// wins, otherwise `min(0.5 * 2^attempt, 30)` seconds.
pub(crate) fn compute_backoff(attempt: u32, retry_after: Option<&str>) -> Duration {
    if let Some(hint) = retry_after {
        if let Ok(secs) = hint.trim().parse::<f64>() {
            if secs >= 0.0 {
                return Duration::from_secs_f64(secs);
            }
        }
    }
    let millis = 500u64.saturating_mul(1u64 << attempt.min(31));
    Duration::from_millis(millis).min(MAX_BACKOFF)
}

/// Pull a string-or-number error code out of a JSON value
fn value_to_code(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Classify a terminal non-2xx response body into the error taxonomy.
///
/// The body is parsed as JSON when possible (either a nested `error`
/// object or top-level `message`/`error_message` and `code`/`error_code`
/// fields), falling back to the raw text.
pub(crate) fn classify_error(
    status: u16,
    body: &str,
    method: &str,
    endpoint: &str,
    request_body: Option<Value>,
) -> KalshiError {
    let (message, code) = match serde_json::from_str::<Value>(body) {
        Ok(data) => {
            let inner = data.get("error").filter(|v| v.is_object());
            let message = inner
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .or_else(|| data.get("message").and_then(Value::as_str))
                .or_else(|| data.get("error_message").and_then(Value::as_str))
                .unwrap_or("Unknown Error")
                .to_string();
            let code = inner
                .and_then(|e| e.get("code"))
                .and_then(value_to_code)
                .or_else(|| data.get("code").and_then(value_to_code))
                .or_else(|| data.get("error_code").and_then(value_to_code));
            (message, code)
        }
        Err(_) => (body.to_string(), None),
    };

    let failure = ApiFailure {
        status,
        message,
        code: code.clone(),
        method: Some(method.to_string()),
        endpoint: Some(endpoint.to_string()),
        request_body,
    };

    match status {
        401 | 403 => KalshiError::Authentication(failure),
        404 => KalshiError::NotFound(failure),
        _ => match code.as_deref() {
            Some("insufficient_funds") | Some("insufficient_balance") => {
                KalshiError::InsufficientFunds(failure)
            }
            Some(
                "order_rejected" | "market_closed" | "market_settled" | "invalid_price"
                | "self_trade" | "post_only_rejected",
            ) => KalshiError::OrderRejected(failure),
            _ => KalshiError::Api(failure),
        },
    }
}

/// Build `path?k=v&...`, skipping parameters with no value. A pagination
/// cursor overrides any caller-supplied `cursor` parameter.
pub(crate) fn build_endpoint(
    path: &str,
    params: &[(&str, Option<String>)],
    cursor: Option<&str>,
) -> String {
    let mut parts: Vec<String> = params
        .iter()
        .filter(|(key, _)| !(cursor.is_some() && *key == "cursor"))
        .filter_map(|(key, value)| value.as_ref().map(|v| format!("{}={}", key, v)))
        .collect();
    if let Some(cursor) = cursor {
        parts.push(format!("cursor={}", cursor));
    }

    if parts.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, parts.join("&"))
    }
}

/// Drive cursor pagination over a page-fetching closure.
///
/// Items are accumulated in strict page-arrival order with no
/// deduplication. Stops after one page unless `fetch_all`, or when the
/// returned cursor is empty.
pub(crate) async fn walk_pages<F, Fut>(
    mut fetch_page: F,
    items_key: &str,
    fetch_all: bool,
) -> Result<Vec<Value>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    let mut cursor: Option<String> = None;
    let mut all_items = Vec::new();

    loop {
        let response = fetch_page(cursor.clone()).await?;

        if let Some(items) = response.get(items_key).and_then(Value::as_array) {
            all_items.extend(items.iter().cloned());
        }

        let next = response
            .get("cursor")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_owned);

        if !fetch_all || next.is_none() {
            break;
        }
        cursor = next;
    }

    Ok(all_items)
}

impl KalshiClient {
    /// Execute one logical HTTP call with retry on transient failures.
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<String>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.config.api_base, endpoint);
        let max_retries = self.config.max_retries;

        for attempt in 0..=max_retries {
            if let Some(limiter) = &self.rate_limiter {
                let waited = limiter.acquire().await;
                if !waited.is_zero() {
                    debug!("Rate limiter waited {:?}", waited);
                }
            }

            // Fresh signature per attempt: the timestamp must be current
            let mut request = self
                .http
                .request(method.clone(), &url)
                .timeout(self.config.timeout);
            for (key, value) in self.signer.headers(method.as_str(), endpoint) {
                request = request.header(&key, &value);
            }
            if let Some(ref body) = body {
                request = request.body(body.clone());
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    if attempt == max_retries {
                        return Err(KalshiError::Transport(e));
                    }
                    let wait = compute_backoff(attempt, None);
                    warn!(
                        "{} {} failed ({}), retry {}/{} in {:?}",
                        method,
                        endpoint,
                        e,
                        attempt + 1,
                        max_retries,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Err(e) => return Err(KalshiError::Transport(e)),
            };

            if let Some(limiter) = &self.rate_limiter {
                let remaining = header_i64(&response, "X-RateLimit-Remaining");
                let reset_at = header_i64(&response, "X-RateLimit-Reset");
                limiter.update_from_headers(remaining, reset_at);
            }

            let status = response.status().as_u16();
            if !RETRYABLE_STATUS.contains(&status) {
                return Ok(response);
            }
            if attempt == max_retries {
                if status == 429 {
                    return Err(KalshiError::RateLimited(ApiFailure {
                        status,
                        message: "Rate limit exceeded after retries".to_string(),
                        code: None,
                        method: Some(method.to_string()),
                        endpoint: Some(endpoint.to_string()),
                        request_body: None,
                    }));
                }
                return Ok(response);
            }

            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let wait = compute_backoff(attempt, retry_after.as_deref());
            warn!(
                "{} {} returned {}, retry {}/{} in {:?}",
                method,
                endpoint,
                status,
                attempt + 1,
                max_retries,
                wait
            );
            tokio::time::sleep(wait).await;
        }

        unreachable!("retry loop always returns")
    }

    /// Turn a response into JSON or a classified error.
    async fn handle_response(
        &self,
        response: Response,
        method: &str,
        endpoint: &str,
        request_body: Option<Value>,
    ) -> Result<Value> {
        let status = response.status().as_u16();

        if status < 400 {
            debug!("Response {}: success", status);
            if status == 204 {
                return Ok(Value::Object(Default::default()));
            }
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                return Ok(Value::Object(Default::default()));
            }
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let text = response.text().await.unwrap_or_default();
        error!("Response {}: error body: {}", status, text);
        Err(classify_error(status, &text, method, endpoint, request_body))
    }

    /// Make an authenticated GET request
    pub async fn get(&self, endpoint: &str) -> Result<Value> {
        debug!("GET {}", endpoint);
        let response = self.request(Method::GET, endpoint, None).await?;
        self.handle_response(response, "GET", endpoint, None).await
    }

    /// Make an authenticated POST request
    pub async fn post(&self, endpoint: &str, data: Value) -> Result<Value> {
        debug!("POST {}", endpoint);
        let response = self
            .request(Method::POST, endpoint, Some(data.to_string()))
            .await?;
        self.handle_response(response, "POST", endpoint, Some(data))
            .await
    }

    /// Make an authenticated PUT request
    pub async fn put(&self, endpoint: &str, data: Value) -> Result<Value> {
        debug!("PUT {}", endpoint);
        let response = self
            .request(Method::PUT, endpoint, Some(data.to_string()))
            .await?;
        self.handle_response(response, "PUT", endpoint, Some(data))
            .await
    }

    /// Make an authenticated DELETE request
    pub async fn delete(&self, endpoint: &str) -> Result<Value> {
        debug!("DELETE {}", endpoint);
        let response = self.request(Method::DELETE, endpoint, None).await?;
        self.handle_response(response, "DELETE", endpoint, None)
            .await
    }

    /// DELETE with a JSON body (batch cancellation uses this)
    pub async fn delete_with_body(&self, endpoint: &str, data: Value) -> Result<Value> {
        debug!("DELETE {}", endpoint);
        let response = self
            .request(Method::DELETE, endpoint, Some(data.to_string()))
            .await?;
        self.handle_response(response, "DELETE", endpoint, Some(data))
            .await
    }

    /// Fetch items with automatic cursor-based pagination.
    ///
    /// Parameters with no value are omitted from the query string.
    pub async fn paginated_get(
        &self,
        path: &str,
        items_key: &str,
        params: &[(&str, Option<String>)],
        fetch_all: bool,
    ) -> Result<Vec<Value>> {
        walk_pages(
            |cursor| {
                let endpoint = build_endpoint(path, params, cursor.as_deref());
                async move { self.get(&endpoint).await }
            },
            items_key,
            fetch_all,
        )
        .await
    }
}

/// Parse an integer response header, if present
fn header_i64(response: &Response, name: &str) -> Option<i64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
