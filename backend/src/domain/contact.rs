//! Messages sent through the public contact form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContactMessageId, Email};

/// Longest accepted message body.
pub const CONTACT_MESSAGE_MAX: usize = 5_000;

/// Validation errors for contact submissions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContactValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("message must be at most {CONTACT_MESSAGE_MAX} characters")]
    MessageTooLong,
}

/// Triage state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    New,
    Resolved,
}

impl ContactStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Resolved => "resolved",
        }
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "resolved" => Ok(Self::Resolved),
            _ => Err(()),
        }
    }
}

/// Stored contact message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub id: ContactMessageId,
    pub name: String,
    pub email: Email,
    pub subject: Option<String>,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Visitor-supplied fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDraft {
    pub name: String,
    pub email: Email,
    pub subject: Option<String>,
    pub message: String,
}

impl ContactDraft {
    /// Validate text fields.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.name.trim().is_empty() {
            return Err(ContactValidationError::EmptyName);
        }
        let message = self.message.trim();
        if message.is_empty() {
            return Err(ContactValidationError::EmptyMessage);
        }
        if message.chars().count() > CONTACT_MESSAGE_MAX {
            return Err(ContactValidationError::MessageTooLong);
        }
        Ok(())
    }
}
