//! Student projects, internship applications, and contact messages.

use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::ports::{
    ContactRepository, InternshipRepository, ProjectRepository, RepositoryError,
};
use crate::domain::{
    ContactMessage, ContactMessageId, ContactStatus, InternshipApplication,
    InternshipApplicationId, InternshipStatus, ProjectId, ProjectStatus, ProjectSubmission,
    UserId,
};

use super::Collection;

/// In-memory [`ProjectRepository`].
#[derive(Default)]
pub struct MemoryProjectRepository {
    projects: Collection<ProjectSubmission>,
}

#[async_trait]
impl ProjectRepository for MemoryProjectRepository {
    async fn insert(&self, project: &ProjectSubmission) -> Result<(), RepositoryError> {
        self.projects.insert(project).await
    }

    async fn update(&self, project: &ProjectSubmission) -> Result<(), RepositoryError> {
        self.projects.replace(project).await
    }

    async fn find_by_id(
        &self,
        id: &ProjectId,
    ) -> Result<Option<ProjectSubmission>, RepositoryError> {
        Ok(self.projects.get(id.as_ref()).await)
    }

    async fn list_for_student(
        &self,
        student: &UserId,
    ) -> Result<Vec<ProjectSubmission>, RepositoryError> {
        Ok(self.projects.newest(|p| &p.student_id == student).await)
    }

    async fn list(
        &self,
        status: Option<ProjectStatus>,
        page: PageParams,
    ) -> Result<Paginated<ProjectSubmission>, RepositoryError> {
        Ok(self
            .projects
            .page(|p| status.is_none_or(|s| p.status == s), page)
            .await)
    }

    async fn delete(&self, id: &ProjectId) -> Result<bool, RepositoryError> {
        Ok(self.projects.remove(id.as_ref()).await)
    }
}

/// In-memory [`InternshipRepository`].
#[derive(Default)]
pub struct MemoryInternshipRepository {
    applications: Collection<InternshipApplication>,
}

#[async_trait]
impl InternshipRepository for MemoryInternshipRepository {
    async fn insert(&self, application: &InternshipApplication) -> Result<(), RepositoryError> {
        self.applications.insert(application).await
    }

    async fn update(&self, application: &InternshipApplication) -> Result<(), RepositoryError> {
        self.applications.replace(application).await
    }

    async fn find_by_id(
        &self,
        id: &InternshipApplicationId,
    ) -> Result<Option<InternshipApplication>, RepositoryError> {
        Ok(self.applications.get(id.as_ref()).await)
    }

    async fn list_for_student(
        &self,
        student: &UserId,
    ) -> Result<Vec<InternshipApplication>, RepositoryError> {
        Ok(self.applications.newest(|a| &a.student_id == student).await)
    }

    async fn list(
        &self,
        status: Option<InternshipStatus>,
        page: PageParams,
    ) -> Result<Paginated<InternshipApplication>, RepositoryError> {
        Ok(self
            .applications
            .page(|a| status.is_none_or(|s| a.status == s), page)
            .await)
    }
}

/// In-memory [`ContactRepository`].
#[derive(Default)]
pub struct MemoryContactRepository {
    messages: Collection<ContactMessage>,
}

#[async_trait]
impl ContactRepository for MemoryContactRepository {
    async fn insert(&self, message: &ContactMessage) -> Result<(), RepositoryError> {
        self.messages.insert(message).await
    }

    async fn update(&self, message: &ContactMessage) -> Result<(), RepositoryError> {
        self.messages.replace(message).await
    }

    async fn find_by_id(
        &self,
        id: &ContactMessageId,
    ) -> Result<Option<ContactMessage>, RepositoryError> {
        Ok(self.messages.get(id.as_ref()).await)
    }

    async fn list(
        &self,
        status: Option<ContactStatus>,
        page: PageParams,
    ) -> Result<Paginated<ContactMessage>, RepositoryError> {
        Ok(self
            .messages
            .page(|m| status.is_none_or(|s| m.status == s), page)
            .await)
    }
}
