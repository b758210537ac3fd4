//! Port abstractions for notice and announcement persistence adapters.
use async_trait::async_trait;

use crate::domain::{Announcement, AnnouncementId, Notice, NoticeId};

use super::RepositoryError;

/// Port for notice board entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NoticeRepository: Send + Sync {
    /// Insert a notice.
    async fn insert(&self, notice: &Notice) -> Result<(), RepositoryError>;

    /// Replace an existing notice.
    async fn update(&self, notice: &Notice) -> Result<(), RepositoryError>;

    /// Fetch by identifier.
    async fn find_by_id(&self, id: &NoticeId) -> Result<Option<Notice>, RepositoryError>;

    /// Every active notice; visibility is decided by the caller.
    async fn list_active(&self) -> Result<Vec<Notice>, RepositoryError>;

    /// Remove a notice. Returns whether a record was deleted.
    async fn delete(&self, id: &NoticeId) -> Result<bool, RepositoryError>;

    /// Number of active notices.
    async fn count_active(&self) -> Result<u64, RepositoryError>;
}

/// Port for announcements.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnnouncementRepository: Send + Sync {
    /// Insert an announcement.
    async fn insert(&self, announcement: &Announcement) -> Result<(), RepositoryError>;

    /// Every active announcement, newest first.
    async fn list_active(&self) -> Result<Vec<Announcement>, RepositoryError>;

    /// Remove an announcement. Returns whether a record was deleted.
    async fn delete(&self, id: &AnnouncementId) -> Result<bool, RepositoryError>;
}
