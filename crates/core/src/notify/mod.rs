//! Operational notifications.
//!
//! The crawler emails a fixed operational recipient when a ticket's
//! provider id cannot be resolved.

mod email;

pub use email::EmailNotifier;

use serde::Serialize;
use thiserror::Error;

use crate::config::EmailConfig;

/// Errors that can occur during notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Comma-separated recipient addresses.
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// Fixed addressing for operational notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRoute {
    pub to: String,
    pub from: String,
    pub subject: String,
}

impl NotificationRoute {
    /// Address a body along this route.
    pub fn notification(&self, body: impl Into<String>) -> Notification {
        Notification {
            to: self.to.clone(),
            from: self.from.clone(),
            subject: self.subject.clone(),
            body: body.into(),
        }
    }
}

impl From<&EmailConfig> for NotificationRoute {
    fn from(config: &EmailConfig) -> Self {
        Self {
            to: config.to.clone(),
            from: config.from.clone(),
            subject: config.subject.clone(),
        }
    }
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "email").
    fn channel_name(&self) -> &str;
}
