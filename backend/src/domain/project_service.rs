//! Student project submissions and admin review.

use std::sync::Arc;

use mockable::Clock;
use pagination::{PageParams, Paginated};
use serde_json::json;

use crate::domain::ports::ProjectRepository;
use crate::domain::{
    Audience, AuditAction, AuditEntry, AuditRecorder, CurrentUser, Error, FileStorage, FileUpload,
    NotificationDraft, NotificationKind, NotificationService, ProjectDraft, ProjectId,
    ProjectReview, ProjectStatus, ProjectSubmission,
};

/// Project service.
#[derive(Clone)]
pub struct ProjectService {
    repo: Arc<dyn ProjectRepository>,
    storage: FileStorage,
    notifications: NotificationService,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl ProjectService {
    pub fn new(
        repo: Arc<dyn ProjectRepository>,
        storage: FileStorage,
        notifications: NotificationService,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            storage,
            notifications,
            audit,
            clock,
        }
    }

    /// Submit a project for review.
    pub async fn submit(
        &self,
        student: &CurrentUser,
        draft: ProjectDraft,
        upload: Option<FileUpload>,
    ) -> Result<ProjectSubmission, Error> {
        if draft.title.trim().is_empty() {
            return Err(Error::invalid_request("Project title is required"));
        }
        if draft.description.trim().is_empty() {
            return Err(Error::invalid_request("Project description is required"));
        }
        let file = match upload {
            Some(upload) => Some(self.storage.upload(upload, "projects").await?),
            None => None,
        };
        let now = self.clock.utc();
        let project = ProjectSubmission {
            id: ProjectId::random(),
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            title: draft.title.trim().to_owned(),
            description: draft.description.trim().to_owned(),
            tech_stack: draft.tech_stack,
            branch: student.branch.clone(),
            semester: student.semester,
            repository_url: draft.repository_url,
            demo_url: draft.demo_url,
            file,
            status: ProjectStatus::Pending,
            feedback: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert(&project).await?;
        self.audit
            .record(AuditEntry::new(AuditAction::ProjectSubmitted, Some(&student.id)).target(&project.id))
            .await;
        self.notifications
            .publish_quietly(NotificationDraft {
                recipient: None,
                audience: Audience::Admins,
                title: "New project submission".into(),
                message: format!("{} submitted \"{}\"", project.student_name, project.title),
                kind: NotificationKind::System,
                link: Some("/admin/projects".into()),
            })
            .await;
        Ok(project)
    }

    /// The caller's submissions.
    pub async fn mine(&self, student: &CurrentUser) -> Result<Vec<ProjectSubmission>, Error> {
        Ok(self.repo.list_for_student(&student.id).await?)
    }

    /// Admin listing.
    pub async fn list(
        &self,
        status: Option<ProjectStatus>,
        page: PageParams,
    ) -> Result<Paginated<ProjectSubmission>, Error> {
        Ok(self.repo.list(status, page).await?)
    }

    /// Approve or reject a submission and tell the student.
    pub async fn review(
        &self,
        admin: &CurrentUser,
        id: &ProjectId,
        review: ProjectReview,
    ) -> Result<ProjectSubmission, Error> {
        if review.status == ProjectStatus::Pending {
            return Err(Error::invalid_request("Review must approve or reject"));
        }
        let mut project = self.get(id).await?;
        let now = self.clock.utc();
        project.status = review.status;
        project.feedback = review.feedback;
        project.reviewed_by = Some(admin.id.clone());
        project.reviewed_at = Some(now);
        project.updated_at = now;
        self.repo.update(&project).await?;
        self.audit
            .record(
                AuditEntry::new(AuditAction::ProjectReviewed, Some(&admin.id))
                    .target(id)
                    .details(json!({ "status": project.status })),
            )
            .await;
        let verdict = match project.status {
            ProjectStatus::Approved => "approved",
            _ => "reviewed",
        };
        self.notifications
            .publish_quietly(NotificationDraft {
                recipient: Some(project.student_id.clone()),
                audience: Audience::All,
                title: format!("Project {verdict}"),
                message: format!("\"{}\" was {verdict}", project.title),
                kind: NotificationKind::System,
                link: Some("/projects".into()),
            })
            .await;
        Ok(project)
    }

    /// Withdraw a pending submission (owner) or remove any (admin).
    pub async fn delete(&self, user: &CurrentUser, id: &ProjectId) -> Result<(), Error> {
        let project = self.get(id).await?;
        if !user.is_admin() {
            if project.student_id != user.id {
                return Err(not_found());
            }
            if !project.can_be_withdrawn_by(&user.id) {
                return Err(Error::forbidden("Reviewed projects cannot be withdrawn"));
            }
        }
        if !self.repo.delete(id).await? {
            return Err(not_found());
        }
        if let Some(file) = &project.file {
            self.storage.delete_quietly(&file.url).await;
        }
        Ok(())
    }

    async fn get(&self, id: &ProjectId) -> Result<ProjectSubmission, Error> {
        self.repo.find_by_id(id).await?.ok_or_else(not_found)
    }
}

fn not_found() -> Error {
    Error::not_found("Project not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MockAuditLogRepository, MockBlobStore, MockNotificationBroadcaster,
        MockNotificationRepository, MockProjectRepository, MockUserRepository,
    };
    use crate::domain::test_fixtures::{current, fixture_clock, fixture_timestamp};
    use crate::domain::{ErrorCode, StorageAddressing, UserRole};
    use rstest::rstest;

    fn service(repo: MockProjectRepository) -> ProjectService {
        let clock = fixture_clock();
        let mut audit = MockAuditLogRepository::new();
        audit.expect_insert().returning(|_| Ok(()));
        ProjectService::new(
            Arc::new(repo),
            FileStorage::new(
                None,
                Arc::new(MockBlobStore::new()),
                StorageAddressing::default(),
                false,
                clock.clone(),
            ),
            NotificationService::new(
                Arc::new(MockNotificationRepository::new()),
                Arc::new(MockUserRepository::new()),
                Arc::new(MockNotificationBroadcaster::new()),
                None,
                clock.clone(),
            ),
            AuditRecorder::new(Arc::new(audit), clock.clone()),
            clock,
        )
    }

    fn project(owner: &CurrentUser, status: ProjectStatus) -> ProjectSubmission {
        let now = fixture_timestamp();
        ProjectSubmission {
            id: ProjectId::random(),
            student_id: owner.id.clone(),
            student_name: owner.name.clone(),
            title: "Smart attendance".into(),
            description: "Face recognition attendance".into(),
            tech_stack: vec!["Python".into()],
            branch: None,
            semester: None,
            repository_url: None,
            demo_url: None,
            file: None,
            status,
            feedback: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case::pending_owner(ProjectStatus::Pending, true, None)]
    #[case::reviewed_owner(ProjectStatus::Approved, true, Some(ErrorCode::Forbidden))]
    #[case::stranger(ProjectStatus::Pending, false, Some(ErrorCode::NotFound))]
    #[tokio::test]
    async fn withdrawal_rules(
        #[case] status: ProjectStatus,
        #[case] is_owner: bool,
        #[case] expected: Option<ErrorCode>,
    ) {
        let owner = current(UserRole::Student);
        let caller = if is_owner {
            owner.clone()
        } else {
            current(UserRole::Student)
        };
        let stored = project(&owner, status);
        let mut repo = MockProjectRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        repo.expect_delete().returning(|_| Ok(true));

        let result = service(repo).delete(&caller, &ProjectId::random()).await;
        assert_eq!(result.err().map(|e| e.code()), expected);
    }
}
