//! Port abstraction for outbound email.
use async_trait::async_trait;

use crate::domain::Email;

use super::define_port_error;

define_port_error! {
    /// Errors raised by mail transports.
    pub enum MailError {
        /// No transport is configured.
        NotConfigured => "no email transport configured",
        /// The provider rejected the message.
        Rejected { message: String } => "email rejected: {message}",
        /// The provider could not be reached.
        Transport { message: String } => "email transport failed: {message}",
    }
}

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: Email,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub reply_to: Option<Email>,
}

/// Port for sending email.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `message`.
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}
