//! Outgoing email
//!
//! Handlers never talk to SMTP directly. They render an [`Email`] from
//! [`templates`] and hand it to the [`MailQueue`], whose worker delivers it
//! through a [`Mailer`] with a bounded number of retries.

pub mod queue;
pub mod smtp;
pub mod templates;

pub use self::queue::MailQueue;
pub use self::smtp::SmtpMailer;

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

/// A rendered message with HTML and plain-text alternatives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Mailer used when SMTP is not configured: logs instead of sending and
/// keeps what it was given
#[derive(Default)]
pub struct LogMailer {
    sent: Mutex<Vec<Email>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "SMTP not configured, email logged only");
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}
