//! Internship applications with resume upload.

use std::sync::Arc;

use mockable::Clock;
use pagination::{PageParams, Paginated};
use serde_json::json;
use tracing::info;

use crate::domain::ports::InternshipRepository;
use crate::domain::{
    Audience, AuditAction, AuditEntry, AuditRecorder, CurrentUser, Error, FileStorage, FileUpload,
    InternshipApplication, InternshipApplicationId, InternshipDraft, InternshipStatus,
    NotificationDraft, NotificationKind, NotificationService,
};

const RESUME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Internship service.
#[derive(Clone)]
pub struct InternshipService {
    repo: Arc<dyn InternshipRepository>,
    storage: FileStorage,
    notifications: NotificationService,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl InternshipService {
    pub fn new(
        repo: Arc<dyn InternshipRepository>,
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

    /// Record an application; the resume must be a PDF or Word document.
    pub async fn apply(
        &self,
        student: &CurrentUser,
        draft: InternshipDraft,
        resume: Option<FileUpload>,
    ) -> Result<InternshipApplication, Error> {
        if draft.name.trim().is_empty() {
            return Err(Error::invalid_request("Applicant name is required"));
        }
        if draft.preferred_domain.trim().is_empty() {
            return Err(Error::invalid_request("Preferred domain is required"));
        }
        if let Some(upload) = &resume {
            if !RESUME_TYPES.contains(&upload.content_type.as_str()) {
                return Err(Error::invalid_request("Resume must be a PDF or Word document"));
            }
        }
        let resume = match resume {
            Some(upload) => Some(self.storage.upload(upload, "resumes").await?),
            None => None,
        };
        let now = self.clock.utc();
        let application = InternshipApplication {
            id: InternshipApplicationId::random(),
            student_id: student.id.clone(),
            name: draft.name.trim().to_owned(),
            email: draft.email,
            phone: draft.phone,
            branch: draft.branch,
            semester: draft.semester,
            preferred_domain: draft.preferred_domain.trim().to_owned(),
            resume,
            cover_letter: draft.cover_letter.filter(|c| !c.trim().is_empty()),
            status: InternshipStatus::Pending,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert(&application).await?;
        info!(application_id = %application.id, "internship application received");
        self.audit
            .record(
                AuditEntry::new(AuditAction::InternshipApplied, Some(&student.id))
                    .target(&application.id)
                    .details(json!({ "domain": application.preferred_domain })),
            )
            .await;
        Ok(application)
    }

    /// The caller's applications.
    pub async fn mine(&self, student: &CurrentUser) -> Result<Vec<InternshipApplication>, Error> {
        Ok(self.repo.list_for_student(&student.id).await?)
    }

    /// Admin listing.
    pub async fn list(
        &self,
        status: Option<InternshipStatus>,
        page: PageParams,
    ) -> Result<Paginated<InternshipApplication>, Error> {
        Ok(self.repo.list(status, page).await?)
    }

    /// Move an application along and tell the applicant.
    pub async fn set_status(
        &self,
        admin: &CurrentUser,
        id: &InternshipApplicationId,
        status: InternshipStatus,
        notes: Option<String>,
    ) -> Result<InternshipApplication, Error> {
        let mut application = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Application not found"))?;
        application.status = status;
        if notes.is_some() {
            application.admin_notes = notes;
        }
        application.updated_at = self.clock.utc();
        self.repo.update(&application).await?;
        self.audit
            .record(
                AuditEntry::new(AuditAction::InternshipStatusChanged, Some(&admin.id))
                    .target(id)
                    .details(json!({ "status": status.as_str() })),
            )
            .await;
        self.notifications
            .publish_quietly(NotificationDraft {
                recipient: Some(application.student_id.clone()),
                audience: Audience::All,
                title: "Internship application update".into(),
                message: format!(
                    "Your {} application is now {}",
                    application.preferred_domain,
                    status.as_str()
                ),
                kind: NotificationKind::System,
                link: Some("/internships".into()),
            })
            .await;
        Ok(application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MockAuditLogRepository, MockBlobStore, MockInternshipRepository,
        MockNotificationBroadcaster, MockNotificationRepository, MockUserRepository,
    };
    use crate::domain::test_fixtures::{current, fixture_clock};
    use crate::domain::{Branch, Email, ErrorCode, Semester, StorageAddressing, UserRole};
    use rstest::rstest;

    fn service(repo: MockInternshipRepository, local: MockBlobStore) -> InternshipService {
        let clock = fixture_clock();
        let mut audit = MockAuditLogRepository::new();
        audit.expect_insert().returning(|_| Ok(()));
        InternshipService::new(
            Arc::new(repo),
            FileStorage::new(
                None,
                Arc::new(local),
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

    fn draft() -> InternshipDraft {
        InternshipDraft {
            name: "Asha Patil".into(),
            email: Email::new("asha@example.in").expect("email"),
            phone: None,
            branch: Branch::new("Computer Engineering").expect("branch"),
            semester: Semester::new(5).expect("semester"),
            preferred_domain: "Web development".into(),
            cover_letter: Some("  ".into()),
        }
    }

    fn upload(content_type: &str) -> FileUpload {
        FileUpload {
            bytes: b"%PDF-1.7".to_vec(),
            file_name: "resume.pdf".into(),
            content_type: content_type.into(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn stores_resume_under_resumes_folder() {
        let mut local = MockBlobStore::new();
        local
            .expect_put()
            .withf(|key, _, _| key.as_ref().starts_with("resumes/"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut repo = MockInternshipRepository::new();
        repo.expect_insert().times(1).returning(|_| Ok(()));

        let application = service(repo, local)
            .apply(&current(UserRole::Student), draft(), Some(upload("application/pdf")))
            .await
            .expect("application stored");
        assert_eq!(application.status, InternshipStatus::Pending);
        assert!(application.cover_letter.is_none());
        let resume = application.resume.expect("resume stored");
        assert!(resume.url.starts_with("/uploads/resumes/"));
    }

    #[rstest]
    #[tokio::test]
    async fn rejects_non_document_resume() {
        let mut repo = MockInternshipRepository::new();
        repo.expect_insert().times(0);

        let err = service(repo, MockBlobStore::new())
            .apply(&current(UserRole::Student), draft(), Some(upload("image/png")))
            .await
            .expect_err("png resume rejected");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
