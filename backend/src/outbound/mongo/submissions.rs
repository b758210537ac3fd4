//! Student submissions: projects, internship applications, and contact
//! messages.

use async_trait::async_trait;
use mongodb::Collection;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Document, doc};
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{
    ContactRepository, InternshipRepository, ProjectRepository, RepositoryError,
};
use crate::domain::{
    Branch, ContactMessage, ContactMessageId, ContactStatus, Email, InternshipApplication,
    InternshipApplicationId, InternshipStatus, ProjectId, ProjectStatus, ProjectSubmission,
    Semester, StoredFile, UserId,
};

use super::MongoDatabase;
use super::bson_helpers::{
    convert_page, find_all, find_page, from_bson_date, id_from, oid, oid_opt, to_bson,
    to_bson_date,
};
use super::error_mapping::query_error;

/// `{status: …}` when a status is requested, otherwise everything.
fn status_filter(status: Option<&impl Serialize>) -> Result<Document, RepositoryError> {
    let mut filter = Document::new();
    if let Some(status) = status {
        filter.insert("status", to_bson(status)?);
    }
    Ok(filter)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    student_id: ObjectId,
    student_name: String,
    title: String,
    description: String,
    #[serde(default)]
    tech_stack: Vec<String>,
    branch: Option<Branch>,
    semester: Option<Semester>,
    repository_url: Option<String>,
    demo_url: Option<String>,
    file: Option<StoredFile>,
    status: ProjectStatus,
    feedback: Option<String>,
    reviewed_by: Option<ObjectId>,
    reviewed_at: Option<bson::DateTime>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl ProjectDocument {
    fn from_domain(project: &ProjectSubmission) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&project.id)?,
            student_id: oid(&project.student_id)?,
            student_name: project.student_name.clone(),
            title: project.title.clone(),
            description: project.description.clone(),
            tech_stack: project.tech_stack.clone(),
            branch: project.branch.clone(),
            semester: project.semester,
            repository_url: project.repository_url.clone(),
            demo_url: project.demo_url.clone(),
            file: project.file.clone(),
            status: project.status,
            feedback: project.feedback.clone(),
            reviewed_by: oid_opt(project.reviewed_by.as_ref())?,
            reviewed_at: project.reviewed_at.map(to_bson_date),
            created_at: to_bson_date(project.created_at),
            updated_at: to_bson_date(project.updated_at),
        })
    }

    fn into_domain(self) -> Result<ProjectSubmission, RepositoryError> {
        Ok(ProjectSubmission {
            id: id_from(self.id)?,
            student_id: id_from(self.student_id)?,
            student_name: self.student_name,
            title: self.title,
            description: self.description,
            tech_stack: self.tech_stack,
            branch: self.branch,
            semester: self.semester,
            repository_url: self.repository_url,
            demo_url: self.demo_url,
            file: self.file,
            status: self.status,
            feedback: self.feedback,
            reviewed_by: self.reviewed_by.map(id_from).transpose()?,
            reviewed_at: self.reviewed_at.map(from_bson_date),
            created_at: from_bson_date(self.created_at),
            updated_at: from_bson_date(self.updated_at),
        })
    }
}

/// MongoDB-backed [`ProjectRepository`].
#[derive(Clone)]
pub struct MongoProjectRepository {
    projects: Collection<ProjectDocument>,
}

impl MongoProjectRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            projects: db.collection("projects"),
        }
    }
}

#[async_trait]
impl ProjectRepository for MongoProjectRepository {
    async fn insert(&self, project: &ProjectSubmission) -> Result<(), RepositoryError> {
        self.projects
            .insert_one(ProjectDocument::from_domain(project)?)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn update(&self, project: &ProjectSubmission) -> Result<(), RepositoryError> {
        let document = ProjectDocument::from_domain(project)?;
        self.projects
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn find_by_id(
        &self,
        id: &ProjectId,
    ) -> Result<Option<ProjectSubmission>, RepositoryError> {
        self.projects
            .find_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?
            .map(ProjectDocument::into_domain)
            .transpose()
    }

    async fn list_for_student(
        &self,
        student: &UserId,
    ) -> Result<Vec<ProjectSubmission>, RepositoryError> {
        find_all(&self.projects, doc! { "studentId": oid(student)? }, None)
            .await?
            .into_iter()
            .map(ProjectDocument::into_domain)
            .collect()
    }

    async fn list(
        &self,
        status: Option<ProjectStatus>,
        page: PageParams,
    ) -> Result<Paginated<ProjectSubmission>, RepositoryError> {
        let page = find_page(&self.projects, status_filter(status.as_ref())?, page).await?;
        convert_page(page, ProjectDocument::into_domain)
    }

    async fn delete(&self, id: &ProjectId) -> Result<bool, RepositoryError> {
        let result = self
            .projects
            .delete_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?;
        Ok(result.deleted_count > 0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InternshipDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    student_id: ObjectId,
    name: String,
    email: Email,
    phone: Option<String>,
    branch: Branch,
    semester: Semester,
    preferred_domain: String,
    resume: Option<StoredFile>,
    cover_letter: Option<String>,
    status: InternshipStatus,
    admin_notes: Option<String>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl InternshipDocument {
    fn from_domain(application: &InternshipApplication) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&application.id)?,
            student_id: oid(&application.student_id)?,
            name: application.name.clone(),
            email: application.email.clone(),
            phone: application.phone.clone(),
            branch: application.branch.clone(),
            semester: application.semester,
            preferred_domain: application.preferred_domain.clone(),
            resume: application.resume.clone(),
            cover_letter: application.cover_letter.clone(),
            status: application.status,
            admin_notes: application.admin_notes.clone(),
            created_at: to_bson_date(application.created_at),
            updated_at: to_bson_date(application.updated_at),
        })
    }

    fn into_domain(self) -> Result<InternshipApplication, RepositoryError> {
        Ok(InternshipApplication {
            id: id_from(self.id)?,
            student_id: id_from(self.student_id)?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            branch: self.branch,
            semester: self.semester,
            preferred_domain: self.preferred_domain,
            resume: self.resume,
            cover_letter: self.cover_letter,
            status: self.status,
            admin_notes: self.admin_notes,
            created_at: from_bson_date(self.created_at),
            updated_at: from_bson_date(self.updated_at),
        })
    }
}

/// MongoDB-backed [`InternshipRepository`].
#[derive(Clone)]
pub struct MongoInternshipRepository {
    applications: Collection<InternshipDocument>,
}

impl MongoInternshipRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            applications: db.collection("internships"),
        }
    }
}

#[async_trait]
impl InternshipRepository for MongoInternshipRepository {
    async fn insert(&self, application: &InternshipApplication) -> Result<(), RepositoryError> {
        self.applications
            .insert_one(InternshipDocument::from_domain(application)?)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn update(&self, application: &InternshipApplication) -> Result<(), RepositoryError> {
        let document = InternshipDocument::from_domain(application)?;
        self.applications
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn find_by_id(
        &self,
        id: &InternshipApplicationId,
    ) -> Result<Option<InternshipApplication>, RepositoryError> {
        self.applications
            .find_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?
            .map(InternshipDocument::into_domain)
            .transpose()
    }

    async fn list_for_student(
        &self,
        student: &UserId,
    ) -> Result<Vec<InternshipApplication>, RepositoryError> {
        find_all(&self.applications, doc! { "studentId": oid(student)? }, None)
            .await?
            .into_iter()
            .map(InternshipDocument::into_domain)
            .collect()
    }

    async fn list(
        &self,
        status: Option<InternshipStatus>,
        page: PageParams,
    ) -> Result<Paginated<InternshipApplication>, RepositoryError> {
        let page = find_page(&self.applications, status_filter(status.as_ref())?, page).await?;
        convert_page(page, InternshipDocument::into_domain)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    email: Email,
    subject: Option<String>,
    message: String,
    status: ContactStatus,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl ContactDocument {
    fn from_domain(message: &ContactMessage) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&message.id)?,
            name: message.name.clone(),
            email: message.email.clone(),
            subject: message.subject.clone(),
            message: message.message.clone(),
            status: message.status,
            created_at: to_bson_date(message.created_at),
            updated_at: to_bson_date(message.updated_at),
        })
    }

    fn into_domain(self) -> Result<ContactMessage, RepositoryError> {
        Ok(ContactMessage {
            id: id_from(self.id)?,
            name: self.name,
            email: self.email,
            subject: self.subject,
            message: self.message,
            status: self.status,
            created_at: from_bson_date(self.created_at),
            updated_at: from_bson_date(self.updated_at),
        })
    }
}

/// MongoDB-backed [`ContactRepository`].
#[derive(Clone)]
pub struct MongoContactRepository {
    messages: Collection<ContactDocument>,
}

impl MongoContactRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            messages: db.collection("contacts"),
        }
    }
}

#[async_trait]
impl ContactRepository for MongoContactRepository {
    async fn insert(&self, message: &ContactMessage) -> Result<(), RepositoryError> {
        self.messages
            .insert_one(ContactDocument::from_domain(message)?)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn update(&self, message: &ContactMessage) -> Result<(), RepositoryError> {
        let document = ContactDocument::from_domain(message)?;
        self.messages
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn find_by_id(
        &self,
        id: &ContactMessageId,
    ) -> Result<Option<ContactMessage>, RepositoryError> {
        self.messages
            .find_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?
            .map(ContactDocument::into_domain)
            .transpose()
    }

    async fn list(
        &self,
        status: Option<ContactStatus>,
        page: PageParams,
    ) -> Result<Paginated<ContactMessage>, RepositoryError> {
        let page = find_page(&self.messages, status_filter(status.as_ref())?, page).await?;
        convert_page(page, ContactDocument::into_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn status_filter_uses_wire_names() {
        let filter = status_filter(Some(&InternshipStatus::Shortlisted)).expect("filter");
        assert_eq!(filter, doc! { "status": "shortlisted" });
        let everything = status_filter(None::<&ProjectStatus>).expect("filter");
        assert!(everything.is_empty());
    }
}
