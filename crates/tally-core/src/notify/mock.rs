//! Mock notifier for testing
//!
//! Records every notification it is asked to send. Can be switched into a
//! failing mode, globally or for specific recipients, to exercise retry paths.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Notification, Notifier};
use crate::error::{Error, Result};

/// Mock notifier; clones share the same recorded state
#[derive(Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: Arc<AtomicBool>,
    failing_recipients: Arc<Mutex<HashSet<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails
    pub fn failing() -> Self {
        let mock = Self::new();
        mock.set_failing(true);
        mock
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail only sends addressed to `recipient`
    pub fn fail_for(&self, recipient: &str) {
        if let Ok(mut set) = self.failing_recipients.lock() {
            set.insert(recipient.to_string());
        }
    }

    /// Notifications delivered so far (failed sends are not recorded)
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let recipient_fails = self
            .failing_recipients
            .lock()
            .map(|set| set.contains(&notification.recipient))
            .unwrap_or(false);

        if self.failing.load(Ordering::SeqCst) || recipient_fails {
            return Err(Error::Notification(format!(
                "mock delivery to {} failed",
                notification.recipient
            )));
        }

        self.sent
            .lock()
            .map_err(|_| Error::Notification("mock notifier poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
