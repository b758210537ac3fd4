//! Port abstraction for subject persistence adapters.
use async_trait::async_trait;

use crate::domain::{Branch, Subject, SubjectCode, SubjectFilter, SubjectId};

use super::RepositoryError;

/// Port for the subject catalogue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Insert a subject; a taken `(code, branch)` yields a duplicate error.
    async fn insert(&self, subject: &Subject) -> Result<(), RepositoryError>;

    /// Replace an existing subject.
    async fn update(&self, subject: &Subject) -> Result<(), RepositoryError>;

    /// Fetch by identifier.
    async fn find_by_id(&self, id: &SubjectId) -> Result<Option<Subject>, RepositoryError>;

    /// Fetch an active subject by code, narrowed to a branch when given.
    async fn find_by_code(
        &self,
        code: &SubjectCode,
        branch: Option<Branch>,
    ) -> Result<Option<Subject>, RepositoryError>;

    /// Active subjects matching the filter, ordered by semester then code.
    async fn list(&self, filter: &SubjectFilter) -> Result<Vec<Subject>, RepositoryError>;

    /// Number of active subjects.
    async fn count_active(&self) -> Result<u64, RepositoryError>;
}
