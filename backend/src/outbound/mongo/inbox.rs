//! Notice, announcement, and notification documents.

use async_trait::async_trait;
use mongodb::Collection;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson, Document, doc};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{
    AnnouncementRepository, NoticeRepository, NotificationRepository, RepositoryError,
};
use crate::domain::{
    Announcement, AnnouncementId, Audience, Branch, CurrentUser, Notice, NoticeId,
    NoticePriority, Notification, NotificationId, NotificationKind, Semester, StoredFile, UserId,
};

use super::MongoDatabase;
use super::bson_helpers::{
    find_all, from_bson_date, id_from, ids_from, oid, oid_opt, to_bson, to_bson_date,
};
use super::error_mapping::query_error;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoticeDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    content: String,
    category: String,
    priority: NoticePriority,
    audience: Audience,
    branch: Option<Branch>,
    semester: Option<Semester>,
    attachment: Option<StoredFile>,
    pinned: bool,
    expires_at: Option<bson::DateTime>,
    is_active: bool,
    author: ObjectId,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl NoticeDocument {
    fn from_domain(notice: &Notice) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&notice.id)?,
            title: notice.title.clone(),
            content: notice.content.clone(),
            category: notice.category.clone(),
            priority: notice.priority,
            audience: notice.audience,
            branch: notice.branch.clone(),
            semester: notice.semester,
            attachment: notice.attachment.clone(),
            pinned: notice.pinned,
            expires_at: notice.expires_at.map(to_bson_date),
            is_active: notice.is_active,
            author: oid(&notice.author)?,
            created_at: to_bson_date(notice.created_at),
            updated_at: to_bson_date(notice.updated_at),
        })
    }

    fn into_domain(self) -> Result<Notice, RepositoryError> {
        Ok(Notice {
            id: id_from(self.id)?,
            title: self.title,
            content: self.content,
            category: self.category,
            priority: self.priority,
            audience: self.audience,
            branch: self.branch,
            semester: self.semester,
            attachment: self.attachment,
            pinned: self.pinned,
            expires_at: self.expires_at.map(from_bson_date),
            is_active: self.is_active,
            author: id_from(self.author)?,
            created_at: from_bson_date(self.created_at),
            updated_at: from_bson_date(self.updated_at),
        })
    }
}

/// MongoDB-backed [`NoticeRepository`].
#[derive(Clone)]
pub struct MongoNoticeRepository {
    notices: Collection<NoticeDocument>,
}

impl MongoNoticeRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            notices: db.collection("notices"),
        }
    }
}

#[async_trait]
impl NoticeRepository for MongoNoticeRepository {
    async fn insert(&self, notice: &Notice) -> Result<(), RepositoryError> {
        self.notices
            .insert_one(NoticeDocument::from_domain(notice)?)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn update(&self, notice: &Notice) -> Result<(), RepositoryError> {
        let document = NoticeDocument::from_domain(notice)?;
        self.notices
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn find_by_id(&self, id: &NoticeId) -> Result<Option<Notice>, RepositoryError> {
        self.notices
            .find_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?
            .map(NoticeDocument::into_domain)
            .transpose()
    }

    async fn list_active(&self) -> Result<Vec<Notice>, RepositoryError> {
        find_all(&self.notices, doc! { "isActive": true }, None)
            .await?
            .into_iter()
            .map(NoticeDocument::into_domain)
            .collect()
    }

    async fn delete(&self, id: &NoticeId) -> Result<bool, RepositoryError> {
        let result = self
            .notices
            .delete_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?;
        Ok(result.deleted_count > 0)
    }

    async fn count_active(&self) -> Result<u64, RepositoryError> {
        self.notices
            .count_documents(doc! { "isActive": true })
            .await
            .map_err(query_error)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnouncementDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    message: String,
    audience: Audience,
    expires_at: Option<bson::DateTime>,
    is_active: bool,
    author: ObjectId,
    created_at: bson::DateTime,
}

impl AnnouncementDocument {
    fn from_domain(announcement: &Announcement) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&announcement.id)?,
            title: announcement.title.clone(),
            message: announcement.message.clone(),
            audience: announcement.audience,
            expires_at: announcement.expires_at.map(to_bson_date),
            is_active: announcement.is_active,
            author: oid(&announcement.author)?,
            created_at: to_bson_date(announcement.created_at),
        })
    }

    fn into_domain(self) -> Result<Announcement, RepositoryError> {
        Ok(Announcement {
            id: id_from(self.id)?,
            title: self.title,
            message: self.message,
            audience: self.audience,
            expires_at: self.expires_at.map(from_bson_date),
            is_active: self.is_active,
            author: id_from(self.author)?,
            created_at: from_bson_date(self.created_at),
        })
    }
}

/// MongoDB-backed [`AnnouncementRepository`].
#[derive(Clone)]
pub struct MongoAnnouncementRepository {
    announcements: Collection<AnnouncementDocument>,
}

impl MongoAnnouncementRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            announcements: db.collection("announcements"),
        }
    }
}

#[async_trait]
impl AnnouncementRepository for MongoAnnouncementRepository {
    async fn insert(&self, announcement: &Announcement) -> Result<(), RepositoryError> {
        self.announcements
            .insert_one(AnnouncementDocument::from_domain(announcement)?)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn list_active(&self) -> Result<Vec<Announcement>, RepositoryError> {
        find_all(&self.announcements, doc! { "isActive": true }, None)
            .await?
            .into_iter()
            .map(AnnouncementDocument::into_domain)
            .collect()
    }

    async fn delete(&self, id: &AnnouncementId) -> Result<bool, RepositoryError> {
        let result = self
            .announcements
            .delete_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?;
        Ok(result.deleted_count > 0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    recipient: Option<ObjectId>,
    audience: Audience,
    title: String,
    message: String,
    #[serde(rename = "type")]
    kind: NotificationKind,
    link: Option<String>,
    #[serde(default)]
    read_by: Vec<ObjectId>,
    created_at: bson::DateTime,
}

impl NotificationDocument {
    fn from_domain(notification: &Notification) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&notification.id)?,
            recipient: oid_opt(notification.recipient.as_ref())?,
            audience: notification.audience,
            title: notification.title.clone(),
            message: notification.message.clone(),
            kind: notification.kind,
            link: notification.link.clone(),
            read_by: notification
                .read_by
                .iter()
                .map(oid)
                .collect::<Result<_, _>>()?,
            created_at: to_bson_date(notification.created_at),
        })
    }

    fn into_domain(self) -> Result<Notification, RepositoryError> {
        Ok(Notification {
            id: id_from(self.id)?,
            recipient: self.recipient.map(id_from).transpose()?,
            audience: self.audience,
            title: self.title,
            message: self.message,
            kind: self.kind,
            link: self.link,
            read_by: ids_from(self.read_by)?,
            created_at: from_bson_date(self.created_at),
        })
    }
}

/// Audiences whose broadcasts reach `user`.
fn admitted_audiences(user: &CurrentUser) -> Vec<Audience> {
    [Audience::All, Audience::Students, Audience::Admins]
        .into_iter()
        .filter(|audience| user.is_admin() || audience.admits(Some(user)))
        .collect()
}

/// Notifications sent directly to `user` or broadcast to an audience
/// that includes them.
fn addressed_to(user: &CurrentUser) -> Result<Document, RepositoryError> {
    let audiences = admitted_audiences(user)
        .iter()
        .map(to_bson)
        .collect::<Result<Vec<Bson>, _>>()?;
    Ok(doc! {
        "$or": [
            { "recipient": oid(&user.id)? },
            { "recipient": null, "audience": { "$in": audiences } },
        ]
    })
}

fn unread_by(user: &CurrentUser) -> Result<Document, RepositoryError> {
    let mut filter = addressed_to(user)?;
    filter.insert("readBy", doc! { "$ne": oid(&user.id)? });
    Ok(filter)
}

/// MongoDB-backed [`NotificationRepository`].
#[derive(Clone)]
pub struct MongoNotificationRepository {
    notifications: Collection<NotificationDocument>,
}

impl MongoNotificationRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            notifications: db.collection("notifications"),
        }
    }
}

#[async_trait]
impl NotificationRepository for MongoNotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<(), RepositoryError> {
        self.notifications
            .insert_one(NotificationDocument::from_domain(notification)?)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn find_by_id(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        self.notifications
            .find_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?
            .map(NotificationDocument::into_domain)
            .transpose()
    }

    async fn list_for(
        &self,
        user: &CurrentUser,
        limit: u32,
    ) -> Result<Vec<Notification>, RepositoryError> {
        find_all(&self.notifications, addressed_to(user)?, Some(i64::from(limit)))
            .await?
            .into_iter()
            .map(NotificationDocument::into_domain)
            .collect()
    }

    async fn mark_read(&self, id: &NotificationId, user: &UserId) -> Result<(), RepositoryError> {
        self.notifications
            .update_one(
                doc! { "_id": oid(id)? },
                doc! { "$addToSet": { "readBy": oid(user)? } },
            )
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn mark_all_read(&self, user: &CurrentUser) -> Result<u64, RepositoryError> {
        let result = self
            .notifications
            .update_many(
                unread_by(user)?,
                doc! { "$addToSet": { "readBy": oid(&user.id)? } },
            )
            .await
            .map_err(query_error)?;
        Ok(result.modified_count)
    }

    async fn count_unread(&self, user: &CurrentUser) -> Result<u64, RepositoryError> {
        self.notifications
            .count_documents(unread_by(user)?)
            .await
            .map_err(query_error)
    }
}
