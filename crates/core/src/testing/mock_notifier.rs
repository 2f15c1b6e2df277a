//! Mock notifier for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::notify::{Notification, Notifier, NotifyError};

/// Mock implementation of the Notifier trait that records deliveries.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Arc<RwLock<Vec<Notification>>>,
    /// If set, every send fails with this message.
    fail_with: Arc<RwLock<Option<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications delivered so far (failed sends are not recorded).
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }

    pub async fn set_fail(&self, message: Option<&str>) {
        *self.fail_with.write().await = message.map(str::to_string);
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if let Some(message) = self.fail_with.read().await.clone() {
            return Err(NotifyError::Smtp(message));
        }
        self.sent.write().await.push(notification.clone());
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "mock"
    }
}
