//! services/api/src/adapters/mail.rs
//!
//! Implementations of the `NotificationService` port.

use async_trait::async_trait;
use kazusa_core::domain::Notification;
use kazusa_core::ports::{NotificationService, PortError, PortResult};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::SmtpConfig;

/// Port 465 speaks implicit TLS; anything else upgrades with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Delivers notifications as plain-text mail through an SMTP relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpNotifier {
    /// Builds the transport. No connection is made until the first send.
    pub fn new(smtp: &SmtpConfig, from: String) -> PortResult<Self> {
        let builder = if smtp.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
        }
        .map_err(|e| PortError::Unexpected(format!("SMTP transport for {}: {e}", smtp.host)))?
        .port(smtp.port);

        let builder = match (&smtp.username, &smtp.password) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn build_message(from: &str, notification: Notification) -> PortResult<Message> {
    let from = from
        .parse()
        .map_err(|e| PortError::Unexpected(format!("invalid sender address '{from}': {e}")))?;
    let to = notification.recipient.parse().map_err(|e| {
        PortError::Unexpected(format!(
            "invalid recipient address '{}': {e}",
            notification.recipient
        ))
    })?;
    Message::builder()
        .from(from)
        .to(to)
        .subject(notification.subject)
        .header(ContentType::TEXT_PLAIN)
        .body(notification.body)
        .map_err(|e| PortError::Unexpected(format!("failed to build message: {e}")))
}

#[async_trait]
impl NotificationService for SmtpNotifier {
    async fn send(&self, notification: Notification) -> PortResult<()> {
        let message = build_message(&self.from, notification)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| PortError::Unexpected(format!("SMTP send failed: {e}")))?;
        Ok(())
    }
}

/// Writes notifications to the log. Used when no SMTP relay is configured.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationService for LogNotifier {
    async fn send(&self, notification: Notification) -> PortResult<()> {
        info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            "{}",
            notification.body
        );
        Ok(())
    }
}
