//! Users and audit log documents.

use async_trait::async_trait;
use mongodb::Collection;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Document, doc};
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ports::{AuditLogRepository, RepositoryError, UserRepository};
use crate::domain::{
    AuditLog, Branch, Email, PasswordHash, PasswordReset, Semester, User, UserFilter, UserId,
    UserRole,
};

use super::MongoDatabase;
use super::bson_helpers::{
    contains_ignore_case, convert_page, equals_ignore_case, find_all, find_page, from_bson_date,
    id_from, oid, oid_opt, to_bson, to_bson_date,
};
use super::error_mapping::{map_driver_error, query_error};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResetDocument {
    token_hash: String,
    expires_at: bson::DateTime,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    email: Email,
    password: String,
    role: UserRole,
    branch: Option<Branch>,
    semester: Option<Semester>,
    phone: Option<String>,
    college: Option<String>,
    enrollment_number: Option<String>,
    avatar_url: Option<String>,
    is_active: bool,
    #[serde(default)]
    device_tokens: Vec<String>,
    password_reset: Option<PasswordResetDocument>,
    last_login_at: Option<bson::DateTime>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl UserDocument {
    fn from_domain(user: &User) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&user.id)?,
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password_hash.as_str().to_owned(),
            role: user.role,
            branch: user.branch.clone(),
            semester: user.semester,
            phone: user.phone.clone(),
            college: user.college.clone(),
            enrollment_number: user.enrollment_number.clone(),
            avatar_url: user.avatar_url.clone(),
            is_active: user.is_active,
            device_tokens: user.device_tokens.clone(),
            password_reset: user.password_reset.as_ref().map(|reset| PasswordResetDocument {
                token_hash: reset.token_hash.clone(),
                expires_at: to_bson_date(reset.expires_at),
            }),
            last_login_at: user.last_login_at.map(to_bson_date),
            created_at: to_bson_date(user.created_at),
            updated_at: to_bson_date(user.updated_at),
        })
    }

    fn into_domain(self) -> Result<User, RepositoryError> {
        Ok(User {
            id: id_from(self.id)?,
            name: self.name,
            email: self.email,
            password_hash: PasswordHash::new(self.password),
            role: self.role,
            branch: self.branch,
            semester: self.semester,
            phone: self.phone,
            college: self.college,
            enrollment_number: self.enrollment_number,
            avatar_url: self.avatar_url,
            is_active: self.is_active,
            device_tokens: self.device_tokens,
            password_reset: self.password_reset.map(|reset| PasswordReset {
                token_hash: reset.token_hash,
                expires_at: from_bson_date(reset.expires_at),
            }),
            last_login_at: self.last_login_at.map(from_bson_date),
            created_at: from_bson_date(self.created_at),
            updated_at: from_bson_date(self.updated_at),
        })
    }
}

fn user_filter(filter: &UserFilter) -> Result<Document, RepositoryError> {
    let mut query = Document::new();
    if let Some(role) = filter.role {
        query.insert("role", role.as_str());
    }
    if let Some(branch) = &filter.branch {
        query.insert("branch", equals_ignore_case(branch.as_ref()));
    }
    if let Some(semester) = filter.semester {
        query.insert("semester", to_bson(&semester)?);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let needle = contains_ignore_case(search.trim());
        query.insert(
            "$or",
            vec![doc! { "name": needle.clone() }, doc! { "email": needle }],
        );
    }
    Ok(query)
}

fn role_filter(role: Option<UserRole>) -> Document {
    role.map_or_else(Document::new, |role| doc! { "role": role.as_str() })
}

/// MongoDB-backed [`UserRepository`].
#[derive(Clone)]
pub struct MongoUserRepository {
    users: Collection<UserDocument>,
}

impl MongoUserRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            users: db.collection("users"),
        }
    }

    async fn find_one(&self, filter: Document) -> Result<Option<User>, RepositoryError> {
        self.users
            .find_one(filter)
            .await
            .map_err(query_error)?
            .map(UserDocument::into_domain)
            .transpose()
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        self.users
            .insert_one(UserDocument::from_domain(user)?)
            .await
            .map(drop)
            .map_err(|err| map_driver_error(&err, "email"))
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let document = UserDocument::from_domain(user)?;
        self.users
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map(drop)
            .map_err(|err| map_driver_error(&err, "email"))
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.find_one(doc! { "_id": oid(id)? }).await
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.find_one(doc! { "email": email.as_ref() }).await
    }

    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.find_one(doc! { "passwordReset.tokenHash": token_hash }).await
    }

    async fn list(
        &self,
        filter: &UserFilter,
        page: PageParams,
    ) -> Result<Paginated<User>, RepositoryError> {
        let page = find_page(&self.users, user_filter(filter)?, page).await?;
        convert_page(page, UserDocument::into_domain)
    }

    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError> {
        let result = self
            .users
            .delete_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?;
        Ok(result.deleted_count > 0)
    }

    async fn count(&self, role: Option<UserRole>) -> Result<u64, RepositoryError> {
        self.users
            .count_documents(role_filter(role))
            .await
            .map_err(query_error)
    }

    async fn push_recipients(&self, role: Option<UserRole>) -> Result<Vec<User>, RepositoryError> {
        let mut filter = role_filter(role);
        filter.insert("isActive", true);
        filter.insert("deviceTokens.0", doc! { "$exists": true });
        find_all(&self.users, filter, None)
            .await?
            .into_iter()
            .map(UserDocument::into_domain)
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditLogDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    action: String,
    actor: Option<ObjectId>,
    target: Option<String>,
    details: Value,
    ip: Option<String>,
    created_at: bson::DateTime,
}

/// MongoDB-backed [`AuditLogRepository`] over the `logs` collection.
#[derive(Clone)]
pub struct MongoAuditLogRepository {
    logs: Collection<AuditLogDocument>,
}

impl MongoAuditLogRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            logs: db.collection("logs"),
        }
    }
}

#[async_trait]
impl AuditLogRepository for MongoAuditLogRepository {
    async fn insert(&self, entry: &AuditLog) -> Result<(), RepositoryError> {
        let document = AuditLogDocument {
            id: oid(&entry.id)?,
            action: entry.action.clone(),
            actor: oid_opt(entry.actor.as_ref())?,
            target: entry.target.clone(),
            details: entry.details.clone(),
            ip: entry.ip.clone(),
            created_at: to_bson_date(entry.created_at),
        };
        self.logs
            .insert_one(document)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn list(
        &self,
        action: Option<String>,
        page: PageParams,
    ) -> Result<Paginated<AuditLog>, RepositoryError> {
        let filter = action.map_or_else(Document::new, |action| doc! { "action": action });
        let page = find_page(&self.logs, filter, page).await?;
        convert_page(page, |log| {
            Ok(AuditLog {
                id: id_from(log.id)?,
                action: log.action,
                actor: log.actor.map(id_from).transpose()?,
                target: log.target,
                details: log.details,
                ip: log.ip,
                created_at: from_bson_date(log.created_at),
            })
        })
    }
}
