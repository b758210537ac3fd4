//! Port abstraction for mobile/web push delivery.
use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by push adapters.
    pub enum PushError {
        /// Credentials could not be exchanged for an access token.
        Auth { message: String } => "push authentication failed: {message}",
        /// Delivery failed.
        Delivery { message: String } => "push delivery failed: {message}",
    }
}

/// Payload delivered to devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

/// Port for push notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushNotifier: Send + Sync {
    /// Send `message` to each device token. Returns the number delivered.
    async fn send(&self, tokens: &[String], message: &PushMessage) -> Result<usize, PushError>;
}
