//! Webhook notification sink.
//!
//! Posts `temperature-alerts` and `delivery-updates` payloads over
//! HTTP with bounded retries. Backoff starts at 100 ms and doubles per
//! attempt; 5xx, 429, and transport failures retry, any other 4xx
//! fails fast (the payload will not get better). When the attempt
//! budget is spent the failure is counted under
//! `unresolved_notifications` and logged - an operator metric, not a
//! silent drop.

use std::time::Duration;

use thiserror::Error;

use coldchain_schemas::{DeliveryUpdatePayload, TemperatureAlertPayload};

/// Webhook-specific errors.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Endpoint answered with a non-success status.
    #[error("endpoint returned status {status}")]
    Status {
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Payload serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Bad sink configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Webhook sink configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Endpoint for the `temperature-alerts` stream.
    pub alerts_url: String,
    /// Endpoint for the `delivery-updates` stream.
    pub updates_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Total attempts per notification, including the first.
    pub max_attempts: u32,
    /// First retry delay; doubles per subsequent attempt.
    pub backoff_base: Duration,
    /// Bearer token attached to every request.
    pub auth_token: Option<String>,
}

impl WebhookConfig {
    /// Configuration for the two stream endpoints.
    pub fn new(alerts_url: impl Into<String>, updates_url: impl Into<String>) -> Self {
        Self {
            alerts_url: alerts_url.into(),
            updates_url: updates_url.into(),
            timeout: Duration::from_secs(30),
            max_attempts: 5,
            backoff_base: Duration::from_millis(100),
            auth_token: None,
        }
    }

    /// Set a bearer token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the attempt budget.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the per-request timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

/// Delivery statistics for one sink.
#[derive(Debug, Default, Clone)]
pub struct WebhookStats {
    /// Notifications delivered.
    pub sent: u64,
    /// Notifications that failed (fast-fail or exhausted).
    pub failed: u64,
    /// Body bytes delivered.
    pub bytes_sent: u64,
    /// Notifications that exhausted their attempt budget.
    pub unresolved_notifications: u64,
}

/// Whether a status code is worth retrying.
fn retryable(status: u16) -> bool {
    status >= 500 || status == 429
}

/// The webhook sink.
pub struct WebhookSink {
    config: WebhookConfig,
    agent: ureq::Agent,
    stats: WebhookStats,
}

impl WebhookSink {
    /// Create a sink. Both endpoints must be http(s) URLs.
    pub fn new(config: WebhookConfig) -> Result<Self, WebhookError> {
        for url in [&config.alerts_url, &config.updates_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(WebhookError::Config(format!("not an http(s) URL: {url}")));
            }
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(concat!("ColdChain/", env!("CARGO_PKG_VERSION")))
            .build();

        Ok(Self {
            config,
            agent,
            stats: WebhookStats::default(),
        })
    }

    /// Post a `temperature-alerts` notification.
    pub async fn send_alert(&mut self, payload: &TemperatureAlertPayload) -> Result<(), WebhookError> {
        let body = serde_json::to_string(payload)?;
        let url = self.config.alerts_url.clone();
        self.post(&url, body).await
    }

    /// Post a `delivery-updates` notification.
    pub async fn send_delivery_update(
        &mut self,
        payload: &DeliveryUpdatePayload,
    ) -> Result<(), WebhookError> {
        let body = serde_json::to_string(payload)?;
        let url = self.config.updates_url.clone();
        self.post(&url, body).await
    }

    /// Delivery statistics so far.
    pub fn stats(&self) -> &WebhookStats {
        &self.stats
    }

    async fn post(&mut self, url: &str, body: String) -> Result<(), WebhookError> {
        let mut last = WebhookError::Transport("no attempt made".into());

        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                let delay = self.config.backoff_base * (1u32 << (attempt - 1).min(16));
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .agent
                .post(url)
                .set("Content-Type", "application/json");
            if let Some(token) = &self.config.auth_token {
                request = request.set("Authorization", &format!("Bearer {token}"));
            }

            match request.send_string(&body) {
                Ok(_) => {
                    self.stats.sent += 1;
                    self.stats.bytes_sent += body.len() as u64;
                    return Ok(());
                }
                Err(ureq::Error::Status(status, _)) if retryable(status) => {
                    last = WebhookError::Status { status };
                }
                Err(ureq::Error::Status(status, _)) => {
                    // Client error: retrying the same payload cannot help
                    self.stats.failed += 1;
                    return Err(WebhookError::Status { status });
                }
                Err(ureq::Error::Transport(e)) => {
                    last = WebhookError::Transport(e.to_string());
                }
            }
        }

        self.stats.failed += 1;
        self.stats.unresolved_notifications += 1;
        log::warn!(
            "webhook delivery to {} unresolved after {} attempts: {}",
            url,
            self.config.max_attempts,
            last
        );
        Err(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = WebhookConfig::new("https://hooks.example.com/alerts", "https://hooks.example.com/updates")
            .bearer_token("token")
            .max_attempts(3)
            .timeout_secs(10);

        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.auth_token.as_deref(), Some("token"));
    }

    #[test]
    fn rejects_non_http_urls() {
        let config = WebhookConfig::new("ftp://hooks.example.com", "https://hooks.example.com");
        assert!(matches!(
            WebhookSink::new(config),
            Err(WebhookError::Config(_))
        ));
    }

    #[test]
    fn retry_classification() {
        assert!(retryable(500));
        assert!(retryable(503));
        assert!(retryable(429));
        assert!(!retryable(400));
        assert!(!retryable(404));
        assert!(!retryable(422));
    }

    #[test]
    fn attempt_budget_has_a_floor() {
        let config = WebhookConfig::new("https://a", "https://b").max_attempts(0);
        assert_eq!(config.max_attempts, 1);
    }
}
