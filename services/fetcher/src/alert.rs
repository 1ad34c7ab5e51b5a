//! Operator alerts.
//!
//! Alerts are fire-and-forget: a failed delivery is logged and otherwise
//! ignored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

/// Timeout for a webhook delivery.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Prefix of alerts about errors that stop the process.
pub const FATAL_PREFIX: &str = ":rotating_light: FATAL ERROR: ";

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, message: &str);
}

/// Posts `{"content": message}` to a chat webhook.
#[derive(Debug, Clone)]
pub struct WebhookAlerter {
    client: Client,
    url: String,
    timeout: Duration,
}

impl WebhookAlerter {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: WEBHOOK_TIMEOUT,
        }
    }
}

#[async_trait]
impl AlertSink for WebhookAlerter {
    async fn notify(&self, message: &str) {
        let result = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "content": message }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Alert delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Alert webhook rejected message");
            }
            Err(e) => {
                warn!(error = %e, "Failed to deliver alert");
            }
        }
    }
}

/// Writes alerts to the log when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlerter;

#[async_trait]
impl AlertSink for LogAlerter {
    async fn notify(&self, message: &str) {
        warn!(alert = %message, "Alert");
    }
}

/// The webhook sink when a URL is given, the log sink otherwise.
pub fn alert_sink(client: Client, webhook_url: Option<String>) -> Arc<dyn AlertSink> {
    match webhook_url.filter(|url| !url.trim().is_empty()) {
        Some(url) => Arc::new(WebhookAlerter::new(client, url)),
        None => Arc::new(LogAlerter),
    }
}

/// Alert text for an error that stops the process.
pub fn fatal_message(error: &impl std::fmt::Display) -> String {
    format!("{}{}", FATAL_PREFIX, error)
}
