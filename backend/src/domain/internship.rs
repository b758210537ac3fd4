//! Internship applications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Branch, Email, InternshipApplicationId, Semester, StoredFile, UserId};

/// Where an application stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InternshipStatus {
    Pending,
    Shortlisted,
    Accepted,
    Rejected,
}

impl InternshipStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Shortlisted => "shortlisted",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for InternshipStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "shortlisted" => Ok(Self::Shortlisted),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(()),
        }
    }
}

/// Application submitted by a student.
#[derive(Debug, Clone, PartialEq)]
pub struct InternshipApplication {
    pub id: InternshipApplicationId,
    pub student_id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub branch: Branch,
    pub semester: Semester,
    pub preferred_domain: String,
    pub resume: Option<StoredFile>,
    pub cover_letter: Option<String>,
    pub status: InternshipStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Student-supplied fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternshipDraft {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub branch: Branch,
    pub semester: Semester,
    pub preferred_domain: String,
    pub cover_letter: Option<String>,
}
