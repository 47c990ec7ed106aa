//! Webhook notifier
//!
//! POSTs each notification as JSON to a relay endpoint (typically a small
//! service in front of the SMTP provider). Any non-2xx answer is a failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{Notification, Notifier};
use crate::error::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct WebhookNotifier {
    http_client: Client,
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Self {
        Self {
            http_client: Client::new(),
            url: url.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create from `NOTIFIER_WEBHOOK_URL`
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("NOTIFIER_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())?;
        Some(Self::new(url.trim()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        debug!(
            url = %self.url,
            template = notification.template.as_str(),
            "Posting notification"
        );

        let response = self
            .http_client
            .post(&self.url)
            .timeout(self.timeout)
            .json(notification)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Notification(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_url() {
        let webhook = WebhookNotifier::new("http://localhost:9000/notify");
        assert_eq!(webhook.url(), "http://localhost:9000/notify");
        assert_eq!(webhook.timeout, DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        // Port 9 (discard) on localhost is almost never listening
        let webhook = WebhookNotifier::new("http://127.0.0.1:9/notify")
            .with_timeout(Duration::from_millis(500));
        let notification = Notification {
            recipient: "a@example.com".to_string(),
            template: super::super::TemplateId::BudgetExhausted,
            values: Default::default(),
        };
        assert!(webhook.send(&notification).await.is_err());
    }
}
