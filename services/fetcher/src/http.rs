//! HTTP client with retry and exponential backoff.
//!
//! Gateway-style failures (500, 502, 503, 504) and connection errors are
//! retried; anything else, timeouts included, fails at once.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::FetchError;

/// Statuses worth another attempt.
pub const RETRY_STATUSES: [StatusCode; 4] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Retry schedule for a single GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry (doubles each retry).
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// A shared `reqwest` client applying a [`RetryPolicy`] to every GET.
#[derive(Debug, Clone)]
pub struct RetryingClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(policy: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()?;
        Ok(Self { client, policy })
    }

    /// GET `url`, returning the first successful response.
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<Response, FetchError> {
        let mut retry = 0;

        loop {
            let last = match self.client.get(url).timeout(timeout).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(url = %url, retry, "GET succeeded");
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    if !RETRY_STATUSES.contains(&status) {
                        return Err(FetchError::Http {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    format!("HTTP {}", status.as_u16())
                }
                Err(e) if e.is_connect() && !e.is_timeout() => e.to_string(),
                Err(e) => {
                    return Err(FetchError::Request {
                        url: url.to_string(),
                        source: e,
                    })
                }
            };

            if retry >= self.policy.max_retries {
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: retry + 1,
                    last,
                });
            }

            retry += 1;
            let delay = self.policy.delay(retry);
            warn!(
                url = %url,
                error = %last,
                retry,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                "GET failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// The underlying client, for requests that must not be retried.
    pub fn inner(&self) -> &Client {
        &self.client
    }
}
