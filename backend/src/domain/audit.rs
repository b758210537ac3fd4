//! Audit trail of notable actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AuditLogId, UserId};

/// Named action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserRegistered,
    UserLoggedIn,
    PasswordChanged,
    PasswordReset,
    UserStatusChanged,
    UserRoleChanged,
    UserDeleted,
    SubjectCreated,
    SubjectUpdated,
    SubjectDisabled,
    MaterialCreated,
    MaterialUpdated,
    MaterialDeleted,
    MaterialDownloaded,
    NoticeCreated,
    NoticeUpdated,
    NoticeDeleted,
    PaymentOrderCreated,
    PaymentVerified,
    PaymentFailed,
    PaymentRefunded,
    SubscriptionCancelled,
    ProjectSubmitted,
    ProjectReviewed,
    InternshipApplied,
    InternshipStatusChanged,
    CourseEnrolled,
    MaintenanceToggled,
}

impl AuditAction {
    /// Stored name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserRegistered => "user_registered",
            Self::UserLoggedIn => "user_logged_in",
            Self::PasswordChanged => "password_changed",
            Self::PasswordReset => "password_reset",
            Self::UserStatusChanged => "user_status_changed",
            Self::UserRoleChanged => "user_role_changed",
            Self::UserDeleted => "user_deleted",
            Self::SubjectCreated => "subject_created",
            Self::SubjectUpdated => "subject_updated",
            Self::SubjectDisabled => "subject_disabled",
            Self::MaterialCreated => "material_created",
            Self::MaterialUpdated => "material_updated",
            Self::MaterialDeleted => "material_deleted",
            Self::MaterialDownloaded => "material_downloaded",
            Self::NoticeCreated => "notice_created",
            Self::NoticeUpdated => "notice_updated",
            Self::NoticeDeleted => "notice_deleted",
            Self::PaymentOrderCreated => "payment_order_created",
            Self::PaymentVerified => "payment_verified",
            Self::PaymentFailed => "payment_failed",
            Self::PaymentRefunded => "payment_refunded",
            Self::SubscriptionCancelled => "subscription_cancelled",
            Self::ProjectSubmitted => "project_submitted",
            Self::ProjectReviewed => "project_reviewed",
            Self::InternshipApplied => "internship_applied",
            Self::InternshipStatusChanged => "internship_status_changed",
            Self::CourseEnrolled => "course_enrolled",
            Self::MaintenanceToggled => "maintenance_toggled",
        }
    }
}

/// One audit trail entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub action: String,
    pub actor: Option<UserId>,
    pub target: Option<String>,
    pub details: Value,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Entry about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub actor: Option<UserId>,
    pub target: Option<String>,
    pub details: Value,
    pub ip: Option<String>,
}

impl AuditEntry {
    /// Start an entry for `action` by `actor`.
    pub fn new(action: AuditAction, actor: Option<&UserId>) -> Self {
        Self {
            action,
            actor: actor.cloned(),
            target: None,
            details: Value::Null,
            ip: None,
        }
    }

    /// Identify what was acted upon.
    pub fn target(mut self, target: impl ToString) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// Attach structured details.
    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Record the client address.
    pub fn ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }
}
