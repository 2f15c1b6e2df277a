//! SMTP email notifier via `lettre`.

use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::config::EmailConfig;

use super::{Notification, Notifier, NotifyError};

/// Sends notifications as plain-text emails via SMTP.
#[derive(Debug)]
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from SMTP configuration.
    ///
    /// With `tls = false` the connection is plain SMTP, as used by internal
    /// relays. Credentials are taken from `SMTP_USERNAME` and
    /// `SMTP_PASSWORD` when both are set.
    pub fn from_config(config: &EmailConfig) -> Result<Self, NotifyError> {
        let mut builder = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(config.smtp_port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
        };

        if let (Ok(username), Ok(password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| {
            NotifyError::Address(format!("{}: {}", address.trim(), e))
        })
}

/// Parse a comma-separated recipient list.
fn parse_recipients(to: &str) -> Result<Vec<Mailbox>, NotifyError> {
    let recipients = to
        .split(',')
        .filter(|addr| !addr.trim().is_empty())
        .map(parse_mailbox)
        .collect::<Result<Vec<_>, _>>()?;

    if recipients.is_empty() {
        return Err(NotifyError::Config(
            "at least one recipient is required".to_string(),
        ));
    }
    Ok(recipients)
}

fn build_message(notification: &Notification) -> Result<Message, NotifyError> {
    let mut builder = Message::builder().from(parse_mailbox(&notification.from)?);
    for recipient in parse_recipients(&notification.to)? {
        builder = builder.to(recipient);
    }

    builder
        .subject(&notification.subject)
        .body(notification.body.clone())
        .map_err(|e| NotifyError::Smtp(e.to_string()))
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let email = build_message(notification)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            subject = %notification.subject,
            to = %notification.to,
            "Notification delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}
