//! Users and the audit trail.

use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::ports::{AuditLogRepository, RepositoryError, UserRepository};
use crate::domain::{AuditLog, Email, User, UserFilter, UserId, UserRole};

use super::Collection;

fn same_email(a: &User, b: &User) -> Option<&'static str> {
    (a.email == b.email).then_some("email")
}

/// In-memory [`UserRepository`] with a unique email constraint.
pub struct MemoryUserRepository {
    users: Collection<User>,
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self {
            users: Collection::with_unique(same_email),
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        self.users.insert(user).await
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        self.users.replace(user).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(id.as_ref()).await)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.find(|u| &u.email == email).await)
    }

    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .find(|u| {
                u.password_reset
                    .as_ref()
                    .is_some_and(|reset| reset.token_hash == token_hash)
            })
            .await)
    }

    async fn list(
        &self,
        filter: &UserFilter,
        page: PageParams,
    ) -> Result<Paginated<User>, RepositoryError> {
        Ok(self.users.page(|u| filter.matches(u), page).await)
    }

    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError> {
        Ok(self.users.remove(id.as_ref()).await)
    }

    async fn count(&self, role: Option<UserRole>) -> Result<u64, RepositoryError> {
        Ok(self.users.count(|u| role.is_none_or(|r| u.role == r)).await)
    }

    async fn push_recipients(&self, role: Option<UserRole>) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .users
            .newest(|u| {
                u.is_active && !u.device_tokens.is_empty() && role.is_none_or(|r| u.role == r)
            })
            .await)
    }
}

/// In-memory [`AuditLogRepository`].
#[derive(Default)]
pub struct MemoryAuditLogRepository {
    logs: Collection<AuditLog>,
}

#[async_trait]
impl AuditLogRepository for MemoryAuditLogRepository {
    async fn insert(&self, entry: &AuditLog) -> Result<(), RepositoryError> {
        self.logs.insert(entry).await
    }

    async fn list(
        &self,
        action: Option<String>,
        page: PageParams,
    ) -> Result<Paginated<AuditLog>, RepositoryError> {
        Ok(self
            .logs
            .page(|log| action.as_deref().is_none_or(|a| log.action == a), page)
            .await)
    }
}
