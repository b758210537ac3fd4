//! Port abstraction for study material persistence adapters.
use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::{Material, MaterialFilter, MaterialId};

use super::RepositoryError;

/// Port for study materials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MaterialRepository: Send + Sync {
    /// Insert a material.
    async fn insert(&self, material: &Material) -> Result<(), RepositoryError>;

    /// Replace an existing material.
    async fn update(&self, material: &Material) -> Result<(), RepositoryError>;

    /// Fetch by identifier, including inactive materials.
    async fn find_by_id(&self, id: &MaterialId) -> Result<Option<Material>, RepositoryError>;

    /// Active materials matching the filter, newest first.
    async fn list(
        &self,
        filter: &MaterialFilter,
        page: PageParams,
    ) -> Result<Paginated<Material>, RepositoryError>;

    /// Remove a material. Returns whether a record was deleted.
    async fn delete(&self, id: &MaterialId) -> Result<bool, RepositoryError>;

    /// Atomically bump the view counter.
    async fn increment_views(&self, id: &MaterialId) -> Result<(), RepositoryError>;

    /// Atomically bump the download counter.
    async fn increment_downloads(&self, id: &MaterialId) -> Result<(), RepositoryError>;

    /// Count active materials matching the filter.
    async fn count(&self, filter: &MaterialFilter) -> Result<u64, RepositoryError>;

    /// Sum of download counters across all materials.
    async fn total_downloads(&self) -> Result<u64, RepositoryError>;

    /// Most downloaded active materials.
    async fn top_downloaded(&self, limit: u32) -> Result<Vec<Material>, RepositoryError>;
}
