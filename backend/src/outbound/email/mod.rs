//! Email transports behind the [`Mailer`](crate::domain::ports::Mailer) port.
//!
//! SendGrid is tried first, then SMTP; [`FallbackMailer`] chains them.
//! [`NoopMailer`] stands in when neither is configured so callers never
//! need to branch on configuration.

mod fallback;
mod sendgrid;
mod smtp;

pub use fallback::{FallbackMailer, NoopMailer};
pub use sendgrid::SendGridMailer;
pub use smtp::{SmtpConfig, SmtpMailer};
