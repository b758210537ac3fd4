//! Port abstraction for course persistence adapters.
use async_trait::async_trait;

use crate::domain::{Branch, Course, CourseId, UserId};

use super::RepositoryError;

/// Port for courses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Insert a course.
    async fn insert(&self, course: &Course) -> Result<(), RepositoryError>;

    /// Replace an existing course.
    async fn update(&self, course: &Course) -> Result<(), RepositoryError>;

    /// Fetch by identifier.
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError>;

    /// Active courses, optionally for one branch, newest first.
    async fn list_active(&self, branch: Option<Branch>) -> Result<Vec<Course>, RepositoryError>;

    /// Remove a course. Returns whether a record was deleted.
    async fn delete(&self, id: &CourseId) -> Result<bool, RepositoryError>;

    /// Add `student` to the enrolment set. Returns false when already present.
    async fn add_student(&self, id: &CourseId, student: &UserId) -> Result<bool, RepositoryError>;
}
