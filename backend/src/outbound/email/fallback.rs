//! Mailer composition: ordered fallback and a logging no-op.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::ports::{EmailMessage, MailError, Mailer};

/// Tries each transport in order until one accepts the message.
pub struct FallbackMailer {
    transports: Vec<(&'static str, Arc<dyn Mailer>)>,
}

impl FallbackMailer {
    /// `transports` are attempted in the given order.
    pub fn new(transports: Vec<(&'static str, Arc<dyn Mailer>)>) -> Self {
        Self { transports }
    }
}

#[async_trait]
impl Mailer for FallbackMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let mut last = MailError::not_configured();
        for (name, transport) in &self.transports {
            match transport.send(message).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(transport = %name, error = %err, "email transport failed");
                    last = err;
                }
            }
        }
        Err(last)
    }
}

/// Used when no transport is configured. Logs and reports
/// [`MailError::NotConfigured`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(to = %message.to, subject = %message.subject, "email not sent: no transport configured");
        Err(MailError::not_configured())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Email;
    use crate::domain::ports::MockMailer;
    use rstest::{fixture, rstest};

    #[fixture]
    fn message() -> EmailMessage {
        EmailMessage {
            to: Email::new("student@example.com").expect("email"),
            subject: "Receipt".into(),
            html: "<p>Paid</p>".into(),
            text: "Paid".into(),
            reply_to: None,
        }
    }

    fn failing() -> Arc<dyn Mailer> {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .times(1)
            .returning(|_| Err(MailError::transport("connection refused")));
        Arc::new(mailer)
    }

    fn succeeding(times: usize) -> Arc<dyn Mailer> {
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(times).returning(|_| Ok(()));
        Arc::new(mailer)
    }

    #[rstest]
    #[tokio::test]
    async fn falls_through_to_the_next_transport(message: EmailMessage) {
        let mailer = FallbackMailer::new(vec![("sendgrid", failing()), ("smtp", succeeding(1))]);
        mailer.send(&message).await.expect("smtp delivers");
    }

    #[rstest]
    #[tokio::test]
    async fn stops_at_the_first_success(message: EmailMessage) {
        let mailer = FallbackMailer::new(vec![("sendgrid", succeeding(1)), ("smtp", succeeding(0))]);
        mailer.send(&message).await.expect("sendgrid delivers");
    }

    #[rstest]
    #[tokio::test]
    async fn reports_the_last_failure(message: EmailMessage) {
        let mailer = FallbackMailer::new(vec![("sendgrid", failing())]);
        let err = mailer.send(&message).await.expect_err("all failed");
        assert_eq!(err, MailError::transport("connection refused"));
    }

    #[rstest]
    #[tokio::test]
    async fn empty_chain_is_not_configured(message: EmailMessage) {
        let err = FallbackMailer::new(Vec::new())
            .send(&message)
            .await
            .expect_err("nothing to send with");
        assert_eq!(err, MailError::NotConfigured);
        assert_eq!(NoopMailer.send(&message).await, Err(MailError::NotConfigured));
    }
}
