//! Subject catalogue use-cases.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{RepositoryError, SubjectRepository};
use crate::domain::{
    AuditAction, AuditEntry, AuditRecorder, Branch, CurrentUser, Error, Subject, SubjectCode,
    SubjectDraft, SubjectFilter, SubjectId,
};

/// Subject service.
#[derive(Clone)]
pub struct SubjectService {
    repo: Arc<dyn SubjectRepository>,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl SubjectService {
    pub fn new(repo: Arc<dyn SubjectRepository>, audit: AuditRecorder, clock: Arc<dyn Clock>) -> Self {
        Self { repo, audit, clock }
    }

    /// Active subjects, ordered by semester then code.
    pub async fn list(&self, filter: &SubjectFilter) -> Result<Vec<Subject>, Error> {
        Ok(self.repo.list(filter).await?)
    }

    /// Active subject by code.
    pub async fn find_by_code(
        &self,
        code: &SubjectCode,
        branch: Option<Branch>,
    ) -> Result<Subject, Error> {
        self.repo
            .find_by_code(code, branch)
            .await?
            .ok_or_else(|| Error::not_found("Subject not found"))
    }

    /// Create a subject; `(code, branch)` must be unused.
    pub async fn create(&self, admin: &CurrentUser, draft: SubjectDraft) -> Result<Subject, Error> {
        draft
            .validate()
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        if self
            .repo
            .find_by_code(&draft.code, Some(draft.branch.clone()))
            .await?
            .is_some()
        {
            return Err(duplicate_code(&draft.code));
        }
        let now = self.clock.utc();
        let subject = Subject {
            id: SubjectId::random(),
            code: draft.code,
            name: draft.name.trim().to_owned(),
            branch: draft.branch,
            semester: draft.semester,
            credits: draft.credits,
            description: draft.description,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.repo
            .insert(&subject)
            .await
            .map_err(|err| map_write_error(err, &subject.code))?;
        self.audit
            .record(
                AuditEntry::new(AuditAction::SubjectCreated, Some(&admin.id))
                    .target(&subject.id)
                    .details(serde_json::json!({ "code": subject.code })),
            )
            .await;
        Ok(subject)
    }

    /// Replace a subject's fields.
    pub async fn update(
        &self,
        admin: &CurrentUser,
        id: &SubjectId,
        draft: SubjectDraft,
    ) -> Result<Subject, Error> {
        draft
            .validate()
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let mut subject = self.get(id).await?;
        subject.code = draft.code;
        subject.name = draft.name.trim().to_owned();
        subject.branch = draft.branch;
        subject.semester = draft.semester;
        subject.credits = draft.credits;
        subject.description = draft.description;
        subject.updated_at = self.clock.utc();
        self.repo
            .update(&subject)
            .await
            .map_err(|err| map_write_error(err, &subject.code))?;
        self.audit
            .record(AuditEntry::new(AuditAction::SubjectUpdated, Some(&admin.id)).target(id))
            .await;
        Ok(subject)
    }

    /// Soft-disable a subject.
    pub async fn disable(&self, admin: &CurrentUser, id: &SubjectId) -> Result<(), Error> {
        let mut subject = self.get(id).await?;
        subject.is_active = false;
        subject.updated_at = self.clock.utc();
        self.repo.update(&subject).await?;
        self.audit
            .record(AuditEntry::new(AuditAction::SubjectDisabled, Some(&admin.id)).target(id))
            .await;
        Ok(())
    }

    async fn get(&self, id: &SubjectId) -> Result<Subject, Error> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Subject not found"))
    }
}

fn duplicate_code(code: &SubjectCode) -> Error {
    Error::conflict(format!("Subject {code} already exists for this branch"))
        .with_details(serde_json::json!({ "field": "code" }))
}

fn map_write_error(err: RepositoryError, code: &SubjectCode) -> Error {
    match err {
        RepositoryError::Duplicate { .. } => duplicate_code(code),
        other => other.into(),
    }
}
