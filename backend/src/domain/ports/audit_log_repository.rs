//! Port abstraction for the audit trail.
use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::AuditLog;

use super::RepositoryError;

/// Port for audit log entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append an entry.
    async fn insert(&self, entry: &AuditLog) -> Result<(), RepositoryError>;

    /// Entries, optionally for one action name, newest first.
    async fn list(
        &self,
        action: Option<String>,
        page: PageParams,
    ) -> Result<Paginated<AuditLog>, RepositoryError>;
}
