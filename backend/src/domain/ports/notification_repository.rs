//! Port abstraction for notification persistence adapters.
use async_trait::async_trait;

use crate::domain::{CurrentUser, Notification, NotificationId, UserId};

use super::RepositoryError;

/// Port for in-app notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert a notification.
    async fn insert(&self, notification: &Notification) -> Result<(), RepositoryError>;

    /// Fetch by identifier.
    async fn find_by_id(&self, id: &NotificationId)
    -> Result<Option<Notification>, RepositoryError>;

    /// Newest notifications addressed to `user`.
    async fn list_for(
        &self,
        user: &CurrentUser,
        limit: u32,
    ) -> Result<Vec<Notification>, RepositoryError>;

    /// Record that `user` read notification `id`.
    async fn mark_read(&self, id: &NotificationId, user: &UserId) -> Result<(), RepositoryError>;

    /// Mark everything addressed to `user` as read. Returns how many changed.
    async fn mark_all_read(&self, user: &CurrentUser) -> Result<u64, RepositoryError>;

    /// Unread notifications addressed to `user`.
    async fn count_unread(&self, user: &CurrentUser) -> Result<u64, RepositoryError>;
}
