//! Port abstraction for project submission persistence adapters.
use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::{ProjectId, ProjectStatus, ProjectSubmission, UserId};

use super::RepositoryError;

/// Port for project submissions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Insert a submission.
    async fn insert(&self, project: &ProjectSubmission) -> Result<(), RepositoryError>;

    /// Replace an existing submission.
    async fn update(&self, project: &ProjectSubmission) -> Result<(), RepositoryError>;

    /// Fetch by identifier.
    async fn find_by_id(&self, id: &ProjectId)
    -> Result<Option<ProjectSubmission>, RepositoryError>;

    /// A student's submissions, newest first.
    async fn list_for_student(
        &self,
        student: &UserId,
    ) -> Result<Vec<ProjectSubmission>, RepositoryError>;

    /// All submissions, optionally by status, newest first.
    async fn list(
        &self,
        status: Option<ProjectStatus>,
        page: PageParams,
    ) -> Result<Paginated<ProjectSubmission>, RepositoryError>;

    /// Remove a submission. Returns whether a record was deleted.
    async fn delete(&self, id: &ProjectId) -> Result<bool, RepositoryError>;
}
