//! Notice board and announcement use-cases.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{AnnouncementRepository, NoticeRepository};
use crate::domain::{
    Announcement, AnnouncementId, Audience, AuditAction, AuditEntry, AuditRecorder, CurrentUser,
    Error, FileStorage, FileUpload, Notice, NoticeDraft, NoticeId, NotificationDraft,
    NotificationKind, NotificationService, sort_for_board,
};

/// Fields for a new announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementDraft {
    pub title: String,
    pub message: String,
    pub audience: Audience,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Notice and announcement service.
#[derive(Clone)]
pub struct NoticeService {
    notices: Arc<dyn NoticeRepository>,
    announcements: Arc<dyn AnnouncementRepository>,
    storage: FileStorage,
    notifications: NotificationService,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl NoticeService {
    pub fn new(
        notices: Arc<dyn NoticeRepository>,
        announcements: Arc<dyn AnnouncementRepository>,
        storage: FileStorage,
        notifications: NotificationService,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            notices,
            announcements,
            storage,
            notifications,
            audit,
            clock,
        }
    }

    /// Notices visible to `viewer`, pinned first then newest.
    pub async fn board(&self, viewer: Option<&CurrentUser>) -> Result<Vec<Notice>, Error> {
        let now = self.clock.utc();
        let mut visible: Vec<Notice> = self
            .notices
            .list_active()
            .await?
            .into_iter()
            .filter(|notice| notice.is_visible_to(viewer, now))
            .collect();
        sort_for_board(&mut visible);
        Ok(visible)
    }

    /// One notice, if visible to `viewer`.
    pub async fn get(&self, viewer: Option<&CurrentUser>, id: &NoticeId) -> Result<Notice, Error> {
        let now = self.clock.utc();
        self.notices
            .find_by_id(id)
            .await?
            .filter(|notice| notice.is_visible_to(viewer, now))
            .ok_or_else(not_found)
    }

    /// Publish a notice and notify its audience.
    pub async fn create(
        &self,
        admin: &CurrentUser,
        draft: NoticeDraft,
        attachment: Option<FileUpload>,
    ) -> Result<Notice, Error> {
        let now = self.clock.utc();
        draft
            .validate(now)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let attachment = match attachment {
            Some(upload) => Some(self.storage.upload(upload, "notices").await?),
            None => None,
        };
        let notice = Notice {
            id: NoticeId::random(),
            title: draft.title.trim().to_owned(),
            content: draft.content.trim().to_owned(),
            category: draft.category,
            priority: draft.priority,
            audience: draft.audience,
            branch: draft.branch,
            semester: draft.semester,
            attachment,
            pinned: draft.pinned,
            expires_at: draft.expires_at,
            is_active: true,
            author: admin.id.clone(),
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = self.notices.insert(&notice).await {
            if let Some(file) = &notice.attachment {
                self.storage.delete_quietly(&file.url).await;
            }
            return Err(err.into());
        }
        self.audit
            .record(AuditEntry::new(AuditAction::NoticeCreated, Some(&admin.id)).target(&notice.id))
            .await;
        self.notifications
            .publish_quietly(NotificationDraft {
                recipient: None,
                audience: notice.audience,
                title: notice.title.clone(),
                message: preview(&notice.content),
                kind: NotificationKind::Notice,
                link: Some(format!("/notices/{}", notice.id)),
            })
            .await;
        Ok(notice)
    }

    /// Replace a notice's fields, keeping its attachment unless a new one is given.
    pub async fn update(
        &self,
        admin: &CurrentUser,
        id: &NoticeId,
        draft: NoticeDraft,
        attachment: Option<FileUpload>,
    ) -> Result<Notice, Error> {
        let now = self.clock.utc();
        draft
            .validate(now)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let mut notice = self.notices.find_by_id(id).await?.ok_or_else(not_found)?;
        let replaced = match attachment {
            Some(upload) => {
                let stored = self.storage.upload(upload, "notices").await?;
                notice.attachment.replace(stored)
            }
            None => None,
        };
        notice.title = draft.title.trim().to_owned();
        notice.content = draft.content.trim().to_owned();
        notice.category = draft.category;
        notice.priority = draft.priority;
        notice.audience = draft.audience;
        notice.branch = draft.branch;
        notice.semester = draft.semester;
        notice.pinned = draft.pinned;
        notice.expires_at = draft.expires_at;
        notice.updated_at = now;
        self.notices.update(&notice).await?;
        if let Some(old) = replaced {
            self.storage.delete_quietly(&old.url).await;
        }
        self.audit
            .record(AuditEntry::new(AuditAction::NoticeUpdated, Some(&admin.id)).target(id))
            .await;
        Ok(notice)
    }

    /// Remove a notice and its attachment.
    pub async fn delete(&self, admin: &CurrentUser, id: &NoticeId) -> Result<(), Error> {
        let notice = self.notices.find_by_id(id).await?.ok_or_else(not_found)?;
        if !self.notices.delete(id).await? {
            return Err(not_found());
        }
        if let Some(file) = &notice.attachment {
            self.storage.delete_quietly(&file.url).await;
        }
        self.audit
            .record(AuditEntry::new(AuditAction::NoticeDeleted, Some(&admin.id)).target(id))
            .await;
        Ok(())
    }

    /// Announcements visible to `viewer`, newest first.
    pub async fn announcements(
        &self,
        viewer: Option<&CurrentUser>,
    ) -> Result<Vec<Announcement>, Error> {
        let now = self.clock.utc();
        Ok(self
            .announcements
            .list_active()
            .await?
            .into_iter()
            .filter(|a| a.is_visible_to(viewer, now))
            .collect())
    }

    /// Post an announcement.
    pub async fn announce(
        &self,
        admin: &CurrentUser,
        draft: AnnouncementDraft,
    ) -> Result<Announcement, Error> {
        let now = self.clock.utc();
        if draft.title.trim().is_empty() || draft.message.trim().is_empty() {
            return Err(Error::invalid_request("Title and message are required"));
        }
        if draft.expires_at.is_some_and(|at| at <= now) {
            return Err(Error::invalid_request("Expiry must be in the future"));
        }
        let announcement = Announcement {
            id: AnnouncementId::random(),
            title: draft.title.trim().to_owned(),
            message: draft.message.trim().to_owned(),
            audience: draft.audience,
            expires_at: draft.expires_at,
            is_active: true,
            author: admin.id.clone(),
            created_at: now,
        };
        self.announcements.insert(&announcement).await?;
        self.notifications
            .publish_quietly(NotificationDraft {
                recipient: None,
                audience: announcement.audience,
                title: announcement.title.clone(),
                message: preview(&announcement.message),
                kind: NotificationKind::Info,
                link: None,
            })
            .await;
        Ok(announcement)
    }

    /// Remove an announcement.
    pub async fn remove_announcement(&self, id: &AnnouncementId) -> Result<(), Error> {
        if self.announcements.delete(id).await? {
            Ok(())
        } else {
            Err(Error::not_found("Announcement not found"))
        }
    }
}

fn not_found() -> Error {
    Error::not_found("Notice not found")
}

fn preview(content: &str) -> String {
    const LIMIT: usize = 140;
    if content.chars().count() <= LIMIT {
        return content.to_owned();
    }
    let mut cut: String = content.chars().take(LIMIT).collect();
    cut.push('…');
    cut
}
