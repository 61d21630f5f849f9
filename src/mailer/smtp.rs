use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use log::debug;

use super::{MailError, Mailer, OutgoingEmail};
use crate::config::SmtpSettings;

/// Delivers mail through an SMTP relay using STARTTLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, from: &str) -> Result<Self, MailError> {
        let from = parse_mailbox(from)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|err| MailError::Transport {
                reason: format!("SMTP relay error: {err}"),
            })?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        Ok(Self { transport, from })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|_| MailError::InvalidAddress {
        address: address.to_string(),
    })
}

fn build_message(from: &Mailbox, email: OutgoingEmail) -> Result<Message, MailError> {
    Message::builder()
        .from(from.clone())
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject)
        .multipart(MultiPart::alternative_plain_html(
            email.text_body,
            email.html_body,
        ))
        .map_err(|err| MailError::Build {
            reason: err.to_string(),
        })
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_email(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let to = email.to.clone();
        let message = build_message(&self.from, email)?;
        self.transport
            .send(message)
            .await
            .map_err(|err| MailError::Transport {
                reason: err.to_string(),
            })?;
        debug!("smtp accepted mail to {}", to);
        Ok(())
    }
}
