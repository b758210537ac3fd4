//! Port abstraction for user persistence adapters.
use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::{Email, User, UserFilter, UserId, UserRole};

use super::RepositoryError;

/// Port for reading and writing user accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; a taken email yields [`RepositoryError::Duplicate`].
    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;

    /// Replace an existing user record.
    async fn update(&self, user: &User) -> Result<(), RepositoryError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    /// Fetch a user by normalised email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Fetch the user holding an unexpired or expired reset token hash.
    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// Admin listing, newest first.
    async fn list(
        &self,
        filter: &UserFilter,
        page: PageParams,
    ) -> Result<Paginated<User>, RepositoryError>;

    /// Remove a user. Returns whether a record was deleted.
    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError>;

    /// Count users, optionally by role.
    async fn count(&self, role: Option<UserRole>) -> Result<u64, RepositoryError>;

    /// Active users with at least one push token, optionally by role.
    async fn push_recipients(&self, role: Option<UserRole>) -> Result<Vec<User>, RepositoryError>;
}
