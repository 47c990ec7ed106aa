//! Pluggable notification senders
//!
//! The engine never renders or delivers email itself. It hands a
//! [`Notification`] (recipient, template id, named values) to a [`Notifier`]
//! and treats any failure as non-fatal.
//!
//! # Architecture
//!
//! - `Notifier` trait: the single `send` operation every sender implements
//! - `NotifierClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Senders: `LogNotifier`, `WebhookNotifier`, `MockNotifier`
//!
//! # Configuration
//!
//! Environment variables:
//! - `NOTIFIER`: Sender to use (log, webhook, mock). Default: log
//! - `NOTIFIER_WEBHOOK_URL`: Endpoint for the webhook sender (required for webhook)

mod mock;
mod webhook;

pub use mock::MockNotifier;
pub use webhook::WebhookNotifier;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::models::{AlertKind, Budget};

/// Message templates the engine can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    BudgetTenPercent,
    BudgetExhausted,
}

impl TemplateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetTenPercent => "budget_ten_percent",
            Self::BudgetExhausted => "budget_exhausted",
        }
    }
}

impl From<AlertKind> for TemplateId {
    fn from(kind: AlertKind) -> Self {
        match kind {
            AlertKind::TenPercentRemaining => Self::BudgetTenPercent,
            AlertKind::Exhausted => Self::BudgetExhausted,
        }
    }
}

/// A notification request handed to a sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub template: TemplateId,
    /// Named substitution values for the template
    pub values: BTreeMap<String, String>,
}

impl Notification {
    /// Build the threshold alert for `budget`
    pub fn budget_alert(recipient: &str, kind: AlertKind, budget: &Budget) -> Self {
        let mut values = BTreeMap::new();
        values.insert("budget_title".to_string(), budget.title.clone());
        values.insert("category".to_string(), budget.category.clone());
        values.insert("amount".to_string(), format!("{:.2}", budget.amount));
        values.insert("used".to_string(), format!("{:.2}", budget.used));
        values.insert("remaining".to_string(), format!("{:.2}", budget.remaining()));

        Self {
            recipient: recipient.to_string(),
            template: kind.into(),
            values,
        }
    }
}

/// Trait implemented by every notification sender
///
/// Senders should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification; an error means it was not delivered
    async fn send(&self, notification: &Notification) -> Result<()>;

    /// Sender name (for logging)
    fn name(&self) -> &str;
}

/// Sender that only writes a log event
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            recipient = %notification.recipient,
            template = notification.template.as_str(),
            values = ?notification.values,
            "Notification"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Concrete notifier enum
#[derive(Clone)]
pub enum NotifierClient {
    Log(LogNotifier),
    Webhook(WebhookNotifier),
    Mock(MockNotifier),
}

impl NotifierClient {
    /// Create a notifier from environment variables
    ///
    /// Falls back to the log sender when `NOTIFIER` is unset, unknown, or
    /// names the webhook sender without a URL.
    pub fn from_env() -> Self {
        let kind = std::env::var("NOTIFIER").unwrap_or_else(|_| "log".to_string());

        match kind.to_lowercase().as_str() {
            "log" => NotifierClient::Log(LogNotifier),
            "webhook" => match WebhookNotifier::from_env() {
                Some(webhook) => NotifierClient::Webhook(webhook),
                None => {
                    tracing::warn!("NOTIFIER=webhook but NOTIFIER_WEBHOOK_URL not set, using log");
                    NotifierClient::Log(LogNotifier)
                }
            },
            "mock" => NotifierClient::Mock(MockNotifier::new()),
            _ => {
                tracing::warn!(notifier = %kind, "Unknown NOTIFIER, falling back to log");
                NotifierClient::Log(LogNotifier)
            }
        }
    }

    /// Create a mock notifier for testing
    pub fn mock() -> Self {
        NotifierClient::Mock(MockNotifier::new())
    }
}

#[async_trait]
impl Notifier for NotifierClient {
    async fn send(&self, notification: &Notification) -> Result<()> {
        match self {
            NotifierClient::Log(n) => n.send(notification).await,
            NotifierClient::Webhook(n) => n.send(notification).await,
            NotifierClient::Mock(n) => n.send(notification).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            NotifierClient::Log(n) => n.name(),
            NotifierClient::Webhook(n) => n.name(),
            NotifierClient::Mock(n) => n.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetPeriod, BudgetScope};
    use chrono::{NaiveDate, Utc};

    fn budget() -> Budget {
        Budget {
            id: 7,
            user_id: 1,
            title: "Groceries".to_string(),
            category: "Food".to_string(),
            scope: BudgetScope::Category("Food".to_string()),
            amount: 1000.0,
            used: 1010.0,
            period: BudgetPeriod::Monthly,
            auto_renew: false,
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            alert_10_percent_sent: false,
            alert_exhausted_sent: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_budget_alert_values() {
        let n = Notification::budget_alert("a@example.com", AlertKind::Exhausted, &budget());
        assert_eq!(n.template, TemplateId::BudgetExhausted);
        assert_eq!(n.values["budget_title"], "Groceries");
        assert_eq!(n.values["category"], "Food");
        assert_eq!(n.values["amount"], "1000.00");
        assert_eq!(n.values["used"], "1010.00");
        assert_eq!(n.values["remaining"], "-10.00");
    }

    #[test]
    fn test_template_ids() {
        assert_eq!(
            TemplateId::from(AlertKind::TenPercentRemaining).as_str(),
            "budget_ten_percent"
        );
        assert_eq!(TemplateId::BudgetExhausted.as_str(), "budget_exhausted");
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let n = Notification::budget_alert("a@example.com", AlertKind::Exhausted, &budget());
        assert!(LogNotifier.send(&n).await.is_ok());
    }

    #[tokio::test]
    async fn test_client_delegates_to_mock() {
        let client = NotifierClient::mock();
        let n = Notification::budget_alert("a@example.com", AlertKind::Exhausted, &budget());
        client.send(&n).await.unwrap();

        assert_eq!(client.name(), "mock");
        if let NotifierClient::Mock(mock) = &client {
            assert_eq!(mock.sent(), vec![n]);
        } else {
            panic!("expected mock notifier");
        }
    }
}
