//! Port abstraction for contact message persistence adapters.
use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::{ContactMessage, ContactMessageId, ContactStatus};

use super::RepositoryError;

/// Port for contact form messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Insert a message.
    async fn insert(&self, message: &ContactMessage) -> Result<(), RepositoryError>;

    /// Replace an existing message.
    async fn update(&self, message: &ContactMessage) -> Result<(), RepositoryError>;

    /// Fetch by identifier.
    async fn find_by_id(
        &self,
        id: &ContactMessageId,
    ) -> Result<Option<ContactMessage>, RepositoryError>;

    /// Messages, optionally by status, newest first.
    async fn list(
        &self,
        status: Option<ContactStatus>,
        page: PageParams,
    ) -> Result<Paginated<ContactMessage>, RepositoryError>;
}
