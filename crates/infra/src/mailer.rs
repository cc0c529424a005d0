//! Outgoing mail.
//!
//! [`SmtpMailer`] delivers through the configured SMTP relay. [`LogMailer`]
//! logs messages instead and keeps the most recent ones in memory; it runs
//! when no SMTP server is configured.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("invalid mail address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("mail transport misconfigured: {0}")]
    Config(String),

    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Port for SMTP over implicit TLS; every other port uses STARTTLS.
pub const SMTPS_PORT: u16 = 465;

/// Delivers mail through an SMTP relay (rustls).
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    /// Build a mailer for `server:port`. No connection is made until the
    /// first message is sent.
    pub fn new(
        server: &str,
        port: u16,
        credentials: Option<(String, String)>,
        from: &str,
    ) -> Result<Self, MailError> {
        let from = mailbox(from)?;
        let builder = if port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
        }
        .map_err(|e| MailError::Config(e.to_string()))?
        .port(port);

        let transport = match credentials {
            Some((user, password)) => builder.credentials(Credentials::new(user, password)),
            None => builder,
        }
        .build();

        Ok(Self { from, transport })
    }

    fn message(&self, email: &Email) -> Result<Message, MailError> {
        Message::builder()
            .from(self.from.clone())
            .to(mailbox(&email.to)?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| MailError::Delivery(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let message = self.message(&email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;
        tracing::info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Messages a [`LogMailer`] remembers; older ones are dropped.
pub const LOG_MAILER_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct LogMailer {
    from: String,
    sent: Mutex<VecDeque<Email>>,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            sent: Mutex::new(VecDeque::with_capacity(LOG_MAILER_CAPACITY)),
        }
    }

    pub fn from_address(&self) -> &str {
        &self.from
    }

    /// The most recent messages handed to this mailer, oldest first.
    pub fn sent(&self) -> Vec<Email> {
        self.sent
            .lock()
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(from = %self.from, to = %email.to, subject = %email.subject, "email not delivered (no SMTP server)");
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| MailError::Delivery("mailbox lock poisoned".to_string()))?;
        if sent.len() == LOG_MAILER_CAPACITY {
            sent.pop_front();
        }
        sent.push_back(email);
        Ok(())
    }
}
