//! Subject and material documents.

use async_trait::async_trait;
use mongodb::Collection;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Document, doc};
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{MaterialRepository, RepositoryError, SubjectRepository};
use crate::domain::{
    AccessType, Branch, Material, MaterialFilter, MaterialId, MaterialKind, Semester, StoredFile,
    Subject, SubjectCode, SubjectFilter, SubjectId,
};

use super::MongoDatabase;
use super::bson_helpers::{
    contains_ignore_case, convert_page, equals_ignore_case, find_all, find_page, from_bson_date,
    id_from, oid, sum_field, to_bson, to_bson_date,
};
use super::error_mapping::{map_driver_error, query_error};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubjectDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    code: SubjectCode,
    name: String,
    branch: Branch,
    /// Lower-cased branch backing the `(code, branchKey)` unique index.
    branch_key: String,
    semester: Semester,
    credits: u8,
    description: Option<String>,
    is_active: bool,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl SubjectDocument {
    fn from_domain(subject: &Subject) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&subject.id)?,
            code: subject.code.clone(),
            name: subject.name.clone(),
            branch: subject.branch.clone(),
            branch_key: subject.branch.as_ref().to_lowercase(),
            semester: subject.semester,
            credits: subject.credits,
            description: subject.description.clone(),
            is_active: subject.is_active,
            created_at: to_bson_date(subject.created_at),
            updated_at: to_bson_date(subject.updated_at),
        })
    }

    fn into_domain(self) -> Result<Subject, RepositoryError> {
        Ok(Subject {
            id: id_from(self.id)?,
            code: self.code,
            name: self.name,
            branch: self.branch,
            semester: self.semester,
            credits: self.credits,
            description: self.description,
            is_active: self.is_active,
            created_at: from_bson_date(self.created_at),
            updated_at: from_bson_date(self.updated_at),
        })
    }
}

/// MongoDB-backed [`SubjectRepository`].
#[derive(Clone)]
pub struct MongoSubjectRepository {
    subjects: Collection<SubjectDocument>,
}

impl MongoSubjectRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            subjects: db.collection("subjects"),
        }
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Subject>, RepositoryError> {
        self.subjects
            .find_one(filter)
            .await
            .map_err(query_error)?
            .map(SubjectDocument::into_domain)
            .transpose()
    }
}

#[async_trait]
impl SubjectRepository for MongoSubjectRepository {
    async fn insert(&self, subject: &Subject) -> Result<(), RepositoryError> {
        self.subjects
            .insert_one(SubjectDocument::from_domain(subject)?)
            .await
            .map(drop)
            .map_err(|err| map_driver_error(&err, "code"))
    }

    async fn update(&self, subject: &Subject) -> Result<(), RepositoryError> {
        let document = SubjectDocument::from_domain(subject)?;
        self.subjects
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map(drop)
            .map_err(|err| map_driver_error(&err, "code"))
    }

    async fn find_by_id(&self, id: &SubjectId) -> Result<Option<Subject>, RepositoryError> {
        self.find_one(doc! { "_id": oid(id)? }).await
    }

    async fn find_by_code(
        &self,
        code: &SubjectCode,
        branch: Option<Branch>,
    ) -> Result<Option<Subject>, RepositoryError> {
        let mut filter = doc! { "code": code.as_ref() };
        if let Some(branch) = branch {
            filter.insert("branchKey", branch.as_ref().to_lowercase());
        }
        self.find_one(filter).await
    }

    async fn list(&self, filter: &SubjectFilter) -> Result<Vec<Subject>, RepositoryError> {
        let mut query = doc! { "isActive": true };
        if let Some(branch) = &filter.branch {
            query.insert("branchKey", branch.as_ref().to_lowercase());
        }
        if let Some(semester) = filter.semester {
            query.insert("semester", to_bson(&semester)?);
        }
        let mut subjects = find_all(&self.subjects, query, None)
            .await?
            .into_iter()
            .map(SubjectDocument::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        subjects.sort_by(|a, b| a.semester.cmp(&b.semester).then_with(|| a.code.cmp(&b.code)));
        Ok(subjects)
    }

    async fn count_active(&self) -> Result<u64, RepositoryError> {
        self.subjects
            .count_documents(doc! { "isActive": true })
            .await
            .map_err(query_error)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MaterialDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    description: Option<String>,
    subject_code: SubjectCode,
    subject_name: Option<String>,
    branch: Branch,
    semester: Semester,
    #[serde(rename = "type")]
    kind: MaterialKind,
    file: Option<StoredFile>,
    access_type: AccessType,
    price: i64,
    drive_url: Option<String>,
    downloads: i64,
    views: i64,
    #[serde(default)]
    tags: Vec<String>,
    uploaded_by: ObjectId,
    is_active: bool,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl MaterialDocument {
    fn from_domain(material: &Material) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&material.id)?,
            title: material.title.clone(),
            description: material.description.clone(),
            subject_code: material.subject_code.clone(),
            subject_name: material.subject_name.clone(),
            branch: material.branch.clone(),
            semester: material.semester,
            kind: material.kind,
            file: material.file.clone(),
            access_type: material.access_type,
            price: to_i64(material.price),
            drive_url: material.drive_url.clone(),
            downloads: to_i64(material.downloads),
            views: to_i64(material.views),
            tags: material.tags.clone(),
            uploaded_by: oid(&material.uploaded_by)?,
            is_active: material.is_active,
            created_at: to_bson_date(material.created_at),
            updated_at: to_bson_date(material.updated_at),
        })
    }

    fn into_domain(self) -> Result<Material, RepositoryError> {
        Ok(Material {
            id: id_from(self.id)?,
            title: self.title,
            description: self.description,
            subject_code: self.subject_code,
            subject_name: self.subject_name,
            branch: self.branch,
            semester: self.semester,
            kind: self.kind,
            file: self.file,
            access_type: self.access_type,
            price: to_u64(self.price),
            drive_url: self.drive_url,
            downloads: to_u64(self.downloads),
            views: to_u64(self.views),
            tags: self.tags,
            uploaded_by: id_from(self.uploaded_by)?,
            is_active: self.is_active,
            created_at: from_bson_date(self.created_at),
            updated_at: from_bson_date(self.updated_at),
        })
    }
}

fn material_filter(filter: &MaterialFilter) -> Result<Document, RepositoryError> {
    let mut query = doc! { "isActive": true };
    if let Some(code) = &filter.subject_code {
        query.insert("subjectCode", code.as_ref());
    }
    if let Some(branch) = &filter.branch {
        query.insert("branch", equals_ignore_case(branch.as_ref()));
    }
    if let Some(semester) = filter.semester {
        query.insert("semester", to_bson(&semester)?);
    }
    if let Some(kind) = filter.kind {
        query.insert("type", kind.as_str());
    }
    if let Some(access) = filter.access_type {
        query.insert("accessType", access.as_str());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let needle = contains_ignore_case(search.trim());
        query.insert(
            "$or",
            vec![
                doc! { "title": needle.clone() },
                doc! { "description": needle.clone() },
                doc! { "tags": needle },
            ],
        );
    }
    Ok(query)
}

/// MongoDB-backed [`MaterialRepository`].
#[derive(Clone)]
pub struct MongoMaterialRepository {
    materials: Collection<MaterialDocument>,
}

impl MongoMaterialRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            materials: db.collection("materials"),
        }
    }

    async fn increment(&self, id: &MaterialId, field: &str) -> Result<(), RepositoryError> {
        let mut inc = Document::new();
        inc.insert(field, 1_i64);
        self.materials
            .update_one(doc! { "_id": oid(id)? }, doc! { "$inc": inc })
            .await
            .map(drop)
            .map_err(query_error)
    }
}

#[async_trait]
impl MaterialRepository for MongoMaterialRepository {
    async fn insert(&self, material: &Material) -> Result<(), RepositoryError> {
        self.materials
            .insert_one(MaterialDocument::from_domain(material)?)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn update(&self, material: &Material) -> Result<(), RepositoryError> {
        let document = MaterialDocument::from_domain(material)?;
        self.materials
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn find_by_id(&self, id: &MaterialId) -> Result<Option<Material>, RepositoryError> {
        self.materials
            .find_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?
            .map(MaterialDocument::into_domain)
            .transpose()
    }

    async fn list(
        &self,
        filter: &MaterialFilter,
        page: PageParams,
    ) -> Result<Paginated<Material>, RepositoryError> {
        let page = find_page(&self.materials, material_filter(filter)?, page).await?;
        convert_page(page, MaterialDocument::into_domain)
    }

    async fn delete(&self, id: &MaterialId) -> Result<bool, RepositoryError> {
        let result = self
            .materials
            .delete_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?;
        Ok(result.deleted_count > 0)
    }

    async fn increment_views(&self, id: &MaterialId) -> Result<(), RepositoryError> {
        self.increment(id, "views").await
    }

    async fn increment_downloads(&self, id: &MaterialId) -> Result<(), RepositoryError> {
        self.increment(id, "downloads").await
    }

    async fn count(&self, filter: &MaterialFilter) -> Result<u64, RepositoryError> {
        self.materials
            .count_documents(material_filter(filter)?)
            .await
            .map_err(query_error)
    }

    async fn total_downloads(&self) -> Result<u64, RepositoryError> {
        sum_field(&self.materials, Document::new(), "downloads").await
    }

    async fn top_downloaded(&self, limit: u32) -> Result<Vec<Material>, RepositoryError> {
        use futures_util::TryStreamExt;

        self.materials
            .find(doc! { "isActive": true })
            .sort(doc! { "downloads": -1, "createdAt": -1 })
            .limit(i64::from(limit))
            .await
            .map_err(query_error)?
            .try_collect::<Vec<_>>()
            .await
            .map_err(query_error)?
            .into_iter()
            .map(MaterialDocument::into_domain)
            .collect()
    }
}
