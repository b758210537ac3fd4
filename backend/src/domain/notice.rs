//! Notices and announcements, and who gets to see them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnnouncementId, Branch, CurrentUser, NoticeId, Semester, StoredFile, UserId};

/// Validation errors for notices and announcements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoticeValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("content must not be empty")]
    EmptyContent,
    #[error("expiry must be in the future")]
    ExpiryInPast,
}

/// Intended readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    /// Everyone, including anonymous visitors.
    #[default]
    All,
    /// Signed-in students (and admins).
    Students,
    /// Admins only.
    Admins,
}

impl Audience {
    /// Whether a caller in the given role may see items for this audience.
    pub fn admits(self, viewer: Option<&CurrentUser>) -> bool {
        match self {
            Self::All => true,
            Self::Students => viewer.is_some(),
            Self::Admins => viewer.is_some_and(CurrentUser::is_admin),
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Students => "students",
            Self::Admins => "admins",
        }
    }
}

impl std::str::FromStr for Audience {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "students" | "student" => Ok(Self::Students),
            "admins" | "admin" => Ok(Self::Admins),
            _ => Err(()),
        }
    }
}

/// Display priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticePriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl NoticePriority {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl std::str::FromStr for NoticePriority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" | "medium" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(()),
        }
    }
}

/// Notice board entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: NoticeId,
    pub title: String,
    pub content: String,
    pub category: String,
    pub priority: NoticePriority,
    pub audience: Audience,
    pub branch: Option<Branch>,
    pub semester: Option<Semester>,
    pub attachment: Option<StoredFile>,
    pub pinned: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub author: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notice {
    /// Whether `viewer` may see this notice at `now`.
    ///
    /// Admins see everything that is active and unexpired. Others are bound
    /// by the audience, and by branch/semester targeting when set.
    pub fn is_visible_to(&self, viewer: Option<&CurrentUser>, now: DateTime<Utc>) -> bool {
        if !self.is_active || self.expires_at.is_some_and(|at| at <= now) {
            return false;
        }
        if viewer.is_some_and(CurrentUser::is_admin) {
            return true;
        }
        if !self.audience.admits(viewer) {
            return false;
        }
        let branch_ok = self.branch.as_ref().is_none_or(|target| {
            viewer
                .and_then(|v| v.branch.as_ref())
                .is_some_and(|b| b.matches(target))
        });
        let semester_ok = self
            .semester
            .is_none_or(|target| viewer.and_then(|v| v.semester) == Some(target));
        branch_ok && semester_ok
    }
}

/// Order notices pinned first, then newest first.
pub fn sort_for_board(notices: &mut [Notice]) {
    notices.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// Fields an admin supplies for a notice.
#[derive(Debug, Clone, PartialEq)]
pub struct NoticeDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    pub priority: NoticePriority,
    pub audience: Audience,
    pub branch: Option<Branch>,
    pub semester: Option<Semester>,
    pub pinned: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NoticeDraft {
    /// Validate text fields and expiry.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), NoticeValidationError> {
        if self.title.trim().is_empty() {
            return Err(NoticeValidationError::EmptyTitle);
        }
        if self.content.trim().is_empty() {
            return Err(NoticeValidationError::EmptyContent);
        }
        if self.expires_at.is_some_and(|at| at <= now) {
            return Err(NoticeValidationError::ExpiryInPast);
        }
        Ok(())
    }
}

/// Short-lived banner message.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub message: String,
    pub audience: Audience,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub author: UserId,
    pub created_at: DateTime<Utc>,
}

impl Announcement {
    /// Whether `viewer` may see this announcement at `now`.
    pub fn is_visible_to(&self, viewer: Option<&CurrentUser>, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.expires_at.is_none_or(|at| at > now)
            && (viewer.is_some_and(CurrentUser::is_admin) || self.audience.admits(viewer))
    }
}
