//! Student project submissions and their review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Branch, ProjectId, Semester, StoredFile, UserId};

/// Review state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProjectStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(()),
        }
    }
}

/// Project uploaded by a student for review.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSubmission {
    pub id: ProjectId,
    pub student_id: UserId,
    pub student_name: String,
    pub title: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub branch: Option<Branch>,
    pub semester: Option<Semester>,
    pub repository_url: Option<String>,
    pub demo_url: Option<String>,
    pub file: Option<StoredFile>,
    pub status: ProjectStatus,
    pub feedback: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectSubmission {
    /// Owners may withdraw a submission only while it awaits review.
    pub fn can_be_withdrawn_by(&self, user: &UserId) -> bool {
        &self.student_id == user && self.status == ProjectStatus::Pending
    }
}

/// Student-supplied fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub repository_url: Option<String>,
    pub demo_url: Option<String>,
}

/// Admin review decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReview {
    pub status: ProjectStatus,
    pub feedback: Option<String>,
}

/// Split a comma separated list, trimming and dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(split_list(" rust, actix ,,mongo "), ["rust", "actix", "mongo"]);
    }

    #[rstest]
    #[case(ProjectStatus::Pending, true, true)]
    #[case(ProjectStatus::Approved, true, false)]
    #[case(ProjectStatus::Pending, false, false)]
    fn withdrawal_rules(#[case] status: ProjectStatus, #[case] owner: bool, #[case] expected: bool) {
        let student = UserId::random();
        let now = Utc::now();
        let project = ProjectSubmission {
            id: ProjectId::random(),
            student_id: student.clone(),
            student_name: "Ada".into(),
            title: "Attendance tracker".into(),
            description: "QR based".into(),
            tech_stack: vec![],
            branch: None,
            semester: None,
            repository_url: None,
            demo_url: None,
            file: None,
            status,
            feedback: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };
        let caller = if owner { student } else { UserId::random() };
        assert_eq!(project.can_be_withdrawn_by(&caller), expected);
    }
}
