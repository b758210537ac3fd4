//! SMTP adapter built on lettre.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::domain::Email;
use crate::domain::ports::{EmailMessage, MailError, Mailer};

/// Port for implicit TLS; everything else negotiates STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// SMTP relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Sends mail through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// # Errors
    /// Returns [`MailError::Transport`] when the relay address is invalid.
    pub fn new(config: &SmtpConfig, from: &Email, from_name: &str) -> Result<Self, MailError> {
        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|err| MailError::transport(err.to_string()))?
        .port(config.port);

        let builder = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            transport: builder.build(),
            from: mailbox(from, Some(from_name))?,
        })
    }
}

fn mailbox(email: &Email, name: Option<&str>) -> Result<Mailbox, MailError> {
    let address = email
        .as_ref()
        .parse()
        .map_err(|err: lettre::address::AddressError| MailError::rejected(err.to_string()))?;
    Ok(Mailbox::new(name.map(str::to_owned), address))
}

fn build_message(from: &Mailbox, message: &EmailMessage) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(from.clone())
        .to(mailbox(&message.to, None)?)
        .subject(message.subject.as_str());
    if let Some(reply_to) = &message.reply_to {
        builder = builder.reply_to(mailbox(reply_to, None)?);
    }
    builder
        .multipart(MultiPart::alternative_plain_html(
            message.text.clone(),
            message.html.clone(),
        ))
        .map_err(|err| MailError::rejected(err.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let email = build_message(&self.from, message)?;
        self.transport
            .send(email)
            .await
            .map_err(|err| MailError::transport(err.to_string()))?;
        debug!(to = %message.to, "smtp relay accepted message");
        Ok(())
    }
}
