pub mod smtp;

use async_trait::async_trait;
use derive_more::{Display, Error};
use log::info;

pub use smtp::SmtpMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, Display, Error)]
pub enum MailError {
    #[display(fmt = "invalid address '{}'", address)]
    InvalidAddress { address: String },

    #[display(fmt = "failed to build message: {}", reason)]
    Build { reason: String },

    #[display(fmt = "transport error: {}", reason)]
    Transport { reason: String },
}

/// Transactional email delivery. Transport and retry policy belong to the
/// implementation; callers only compose content.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Writes emails to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, email: OutgoingEmail) -> Result<(), MailError> {
        info!(
            "email to {} | subject: {}\n{}",
            email.to, email.subject, email.text_body
        );
        Ok(())
    }
}
