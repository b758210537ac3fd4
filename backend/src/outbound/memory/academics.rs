//! Subjects and study materials.

use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::ports::{MaterialRepository, RepositoryError, SubjectRepository};
use crate::domain::{Branch, Material, MaterialFilter, MaterialId, Subject, SubjectCode, SubjectFilter, SubjectId};

use super::Collection;

fn same_code_and_branch(a: &Subject, b: &Subject) -> Option<&'static str> {
    (a.code == b.code && a.branch.matches(&b.branch)).then_some("code")
}

/// In-memory [`SubjectRepository`]; `(code, branch)` is unique.
pub struct MemorySubjectRepository {
    subjects: Collection<Subject>,
}

impl Default for MemorySubjectRepository {
    fn default() -> Self {
        Self {
            subjects: Collection::with_unique(same_code_and_branch),
        }
    }
}

#[async_trait]
impl SubjectRepository for MemorySubjectRepository {
    async fn insert(&self, subject: &Subject) -> Result<(), RepositoryError> {
        self.subjects.insert(subject).await
    }

    async fn update(&self, subject: &Subject) -> Result<(), RepositoryError> {
        self.subjects.replace(subject).await
    }

    async fn find_by_id(&self, id: &SubjectId) -> Result<Option<Subject>, RepositoryError> {
        Ok(self.subjects.get(id.as_ref()).await)
    }

    async fn find_by_code(
        &self,
        code: &SubjectCode,
        branch: Option<Branch>,
    ) -> Result<Option<Subject>, RepositoryError> {
        Ok(self
            .subjects
            .find(|s| &s.code == code && branch.as_ref().is_none_or(|b| s.branch.matches(b)))
            .await)
    }

    async fn list(&self, filter: &SubjectFilter) -> Result<Vec<Subject>, RepositoryError> {
        let mut subjects = self.subjects.newest(|s| filter.matches(s)).await;
        subjects.sort_by(|a, b| a.semester.cmp(&b.semester).then_with(|| a.code.cmp(&b.code)));
        Ok(subjects)
    }

    async fn count_active(&self) -> Result<u64, RepositoryError> {
        Ok(self.subjects.count(|s| s.is_active).await)
    }
}

/// In-memory [`MaterialRepository`].
#[derive(Default)]
pub struct MemoryMaterialRepository {
    materials: Collection<Material>,
}

#[async_trait]
impl MaterialRepository for MemoryMaterialRepository {
    async fn insert(&self, material: &Material) -> Result<(), RepositoryError> {
        self.materials.insert(material).await
    }

    async fn update(&self, material: &Material) -> Result<(), RepositoryError> {
        self.materials.replace(material).await
    }

    async fn find_by_id(&self, id: &MaterialId) -> Result<Option<Material>, RepositoryError> {
        Ok(self.materials.get(id.as_ref()).await)
    }

    async fn list(
        &self,
        filter: &MaterialFilter,
        page: PageParams,
    ) -> Result<Paginated<Material>, RepositoryError> {
        Ok(self.materials.page(|m| filter.matches(m), page).await)
    }

    async fn delete(&self, id: &MaterialId) -> Result<bool, RepositoryError> {
        Ok(self.materials.remove(id.as_ref()).await)
    }

    async fn increment_views(&self, id: &MaterialId) -> Result<(), RepositoryError> {
        self.materials
            .modify(
                |m| m.id == *id,
                |m| {
                    m.views += 1;
                    true
                },
            )
            .await;
        Ok(())
    }

    async fn increment_downloads(&self, id: &MaterialId) -> Result<(), RepositoryError> {
        self.materials
            .modify(
                |m| m.id == *id,
                |m| {
                    m.downloads += 1;
                    true
                },
            )
            .await;
        Ok(())
    }

    async fn count(&self, filter: &MaterialFilter) -> Result<u64, RepositoryError> {
        Ok(self.materials.count(|m| filter.matches(m)).await)
    }

    async fn total_downloads(&self) -> Result<u64, RepositoryError> {
        Ok(self.materials.sum(|_| true, |m| m.downloads).await)
    }

    async fn top_downloaded(&self, limit: u32) -> Result<Vec<Material>, RepositoryError> {
        let mut materials = self.materials.newest(|m| m.is_active).await;
        materials.sort_by_key(|m| std::cmp::Reverse(m.downloads));
        materials.truncate(limit as usize);
        Ok(materials)
    }
}
