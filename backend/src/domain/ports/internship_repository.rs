//! Port abstraction for internship application persistence adapters.
use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::{InternshipApplication, InternshipApplicationId, InternshipStatus, UserId};

use super::RepositoryError;

/// Port for internship applications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InternshipRepository: Send + Sync {
    /// Insert an application.
    async fn insert(&self, application: &InternshipApplication) -> Result<(), RepositoryError>;

    /// Replace an existing application.
    async fn update(&self, application: &InternshipApplication) -> Result<(), RepositoryError>;

    /// Fetch by identifier.
    async fn find_by_id(
        &self,
        id: &InternshipApplicationId,
    ) -> Result<Option<InternshipApplication>, RepositoryError>;

    /// A student's applications, newest first.
    async fn list_for_student(
        &self,
        student: &UserId,
    ) -> Result<Vec<InternshipApplication>, RepositoryError>;

    /// All applications, optionally by status, newest first.
    async fn list(
        &self,
        status: Option<InternshipStatus>,
        page: PageParams,
    ) -> Result<Paginated<InternshipApplication>, RepositoryError>;
}
