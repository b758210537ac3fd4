//! Short courses students can enrol in.

use chrono::{DateTime, Utc};

use super::{Branch, CourseId, UserId};

/// Validation errors for course fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CourseValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("description must not be empty")]
    EmptyDescription,
}

/// A course offering.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub branch: Option<Branch>,
    pub instructor: Option<String>,
    pub duration: Option<String>,
    /// Price in paise; zero means free.
    pub price: u64,
    pub thumbnail_url: Option<String>,
    pub enrolled_students: Vec<UserId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// Whether enrolment needs a paid order.
    pub fn is_free(&self) -> bool {
        self.price == 0
    }

    /// Whether `user` is already enrolled.
    pub fn has_student(&self, user: &UserId) -> bool {
        self.enrolled_students.contains(user)
    }
}

/// Admin-supplied fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    pub branch: Option<Branch>,
    pub instructor: Option<String>,
    pub duration: Option<String>,
    pub price: u64,
    pub thumbnail_url: Option<String>,
}

impl CourseDraft {
    /// Validate required text.
    pub fn validate(&self) -> Result<(), CourseValidationError> {
        if self.title.trim().is_empty() {
            return Err(CourseValidationError::EmptyTitle);
        }
        if self.description.trim().is_empty() {
            return Err(CourseValidationError::EmptyDescription);
        }
        Ok(())
    }
}
