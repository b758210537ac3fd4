//! Notices, announcements, and per-user notifications.

use async_trait::async_trait;

use crate::domain::ports::{
    AnnouncementRepository, NoticeRepository, NotificationRepository, RepositoryError,
};
use crate::domain::{
    Announcement, AnnouncementId, CurrentUser, Notice, NoticeId, Notification, NotificationId,
    UserId,
};

use super::Collection;

/// In-memory [`NoticeRepository`].
#[derive(Default)]
pub struct MemoryNoticeRepository {
    notices: Collection<Notice>,
}

#[async_trait]
impl NoticeRepository for MemoryNoticeRepository {
    async fn insert(&self, notice: &Notice) -> Result<(), RepositoryError> {
        self.notices.insert(notice).await
    }

    async fn update(&self, notice: &Notice) -> Result<(), RepositoryError> {
        self.notices.replace(notice).await
    }

    async fn find_by_id(&self, id: &NoticeId) -> Result<Option<Notice>, RepositoryError> {
        Ok(self.notices.get(id.as_ref()).await)
    }

    async fn list_active(&self) -> Result<Vec<Notice>, RepositoryError> {
        Ok(self.notices.newest(|n| n.is_active).await)
    }

    async fn delete(&self, id: &NoticeId) -> Result<bool, RepositoryError> {
        Ok(self.notices.remove(id.as_ref()).await)
    }

    async fn count_active(&self) -> Result<u64, RepositoryError> {
        Ok(self.notices.count(|n| n.is_active).await)
    }
}

/// In-memory [`AnnouncementRepository`].
#[derive(Default)]
pub struct MemoryAnnouncementRepository {
    announcements: Collection<Announcement>,
}

#[async_trait]
impl AnnouncementRepository for MemoryAnnouncementRepository {
    async fn insert(&self, announcement: &Announcement) -> Result<(), RepositoryError> {
        self.announcements.insert(announcement).await
    }

    async fn list_active(&self) -> Result<Vec<Announcement>, RepositoryError> {
        Ok(self.announcements.newest(|a| a.is_active).await)
    }

    async fn delete(&self, id: &AnnouncementId) -> Result<bool, RepositoryError> {
        Ok(self.announcements.remove(id.as_ref()).await)
    }
}

/// In-memory [`NotificationRepository`].
#[derive(Default)]
pub struct MemoryNotificationRepository {
    notifications: Collection<Notification>,
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<(), RepositoryError> {
        self.notifications.insert(notification).await
    }

    async fn find_by_id(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        Ok(self.notifications.get(id.as_ref()).await)
    }

    async fn list_for(
        &self,
        user: &CurrentUser,
        limit: u32,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let mut items = self.notifications.newest(|n| n.is_addressed_to(user)).await;
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn mark_read(&self, id: &NotificationId, user: &UserId) -> Result<(), RepositoryError> {
        self.notifications
            .modify(|n| &n.id == id, |n| mark(n, user))
            .await;
        Ok(())
    }

    async fn mark_all_read(&self, user: &CurrentUser) -> Result<u64, RepositoryError> {
        Ok(self
            .notifications
            .modify(|n| n.is_addressed_to(user), |n| mark(n, &user.id))
            .await)
    }

    async fn count_unread(&self, user: &CurrentUser) -> Result<u64, RepositoryError> {
        Ok(self
            .notifications
            .count(|n| n.is_addressed_to(user) && !n.is_read_by(&user.id))
            .await)
    }
}

fn mark(notification: &mut Notification, user: &UserId) -> bool {
    if notification.is_read_by(user) {
        return false;
    }
    notification.read_by.push(user.clone());
    true
}
