//! Typed document identifiers.
//!
//! Every persisted entity is keyed by a 12-byte ObjectId rendered as 24
//! lowercase hex digits. The domain keeps the textual form so it does not
//! depend on the database driver; persistence adapters convert at the edge.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raised when an identifier is not a 24-digit hex string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} must be a 24 character hex identifier")]
pub struct IdValidationError {
    kind: &'static str,
}

impl IdValidationError {
    /// Name of the identifier type that failed validation.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

fn normalise(raw: &str, kind: &'static str) -> Result<String, IdValidationError> {
    let trimmed = raw.trim();
    if trimmed.len() == 24 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(trimmed.to_ascii_lowercase())
    } else {
        Err(IdValidationError { kind })
    }
}

fn generate_hex() -> String {
    // Same layout as a BSON ObjectId: 4-byte timestamp, then random bytes.
    let seconds = u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX);
    let random = uuid::Uuid::new_v4();
    let mut bytes = [0_u8; 12];
    bytes[..4].copy_from_slice(&seconds.to_be_bytes());
    bytes[4..].copy_from_slice(&random.as_bytes()[..8]);
    hex::encode(bytes)
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and construct the identifier.
            pub fn new(raw: impl AsRef<str>) -> Result<Self, IdValidationError> {
                normalise(raw.as_ref(), $label).map(Self)
            }

            /// Allocate a fresh identifier.
            pub fn random() -> Self {
                Self(generate_hex())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

define_id!(
    /// Identifier of a registered user.
    UserId, "user id"
);
define_id!(
    /// Identifier of a subject.
    SubjectId, "subject id"
);
define_id!(
    /// Identifier of a study material.
    MaterialId, "material id"
);
define_id!(
    /// Identifier of a notice.
    NoticeId, "notice id"
);
define_id!(
    /// Identifier of an announcement.
    AnnouncementId, "announcement id"
);
define_id!(
    /// Identifier of a subscription.
    SubscriptionId, "subscription id"
);
define_id!(
    /// Identifier of a payment order.
    PaymentOrderId, "payment order id"
);
define_id!(
    /// Identifier of a project submission.
    ProjectId, "project id"
);
define_id!(
    /// Identifier of an internship application.
    InternshipApplicationId, "internship application id"
);
define_id!(
    /// Identifier of a course.
    CourseId, "course id"
);
define_id!(
    /// Identifier of a contact message.
    ContactMessageId, "contact message id"
);
define_id!(
    /// Identifier of a notification.
    NotificationId, "notification id"
);
define_id!(
    /// Identifier of an audit log entry.
    AuditLogId, "audit log id"
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("64b7f0c2a1b2c3d4e5f60718")]
    #[case("  64B7F0C2A1B2C3D4E5F60718 ")]
    fn accepts_object_id_hex(#[case] raw: &str) {
        let id = UserId::new(raw).expect("valid id");
        assert_eq!(id.as_ref(), "64b7f0c2a1b2c3d4e5f60718");
    }

    #[rstest]
    #[case("")]
    #[case("64b7f0c2")]
    #[case("zzb7f0c2a1b2c3d4e5f60718")]
    #[case("123e4567-e89b-12d3-a456-426614174000")]
    fn rejects_malformed_ids(#[case] raw: &str) {
        let err = MaterialId::new(raw).expect_err("invalid id");
        assert_eq!(err.kind(), "material id");
    }

    #[rstest]
    fn random_ids_are_valid_and_distinct() {
        let first = CourseId::random();
        let second = CourseId::random();
        assert_ne!(first, second);
        assert!(CourseId::new(first.as_ref()).is_ok());
    }
}
