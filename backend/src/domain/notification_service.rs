//! In-app notifications: persistence, realtime fan-out, and push delivery.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, warn};

use crate::domain::ports::{
    NotificationBroadcaster, NotificationRepository, PushMessage, PushNotifier, UserRepository,
};
use crate::domain::{
    Audience, CurrentUser, Error, Notification, NotificationDraft, NotificationId, UserRole,
};

/// Number of notifications returned by the inbox endpoint.
pub const INBOX_LIMIT: u32 = 50;

/// Inbox entry with the caller's read state resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxItem {
    pub notification: Notification,
    pub read: bool,
}

/// Notification use-cases.
#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserRepository>,
    broadcaster: Arc<dyn NotificationBroadcaster>,
    push: Option<Arc<dyn PushNotifier>>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        users: Arc<dyn UserRepository>,
        broadcaster: Arc<dyn NotificationBroadcaster>,
        push: Option<Arc<dyn PushNotifier>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            users,
            broadcaster,
            push,
            clock,
        }
    }

    /// Persist a notification, then fan it out to sockets and devices.
    ///
    /// Realtime and push delivery are best-effort; only the write can fail.
    pub async fn publish(&self, draft: NotificationDraft) -> Result<Notification, Error> {
        if draft.title.trim().is_empty() || draft.message.trim().is_empty() {
            return Err(Error::invalid_request("title and message are required"));
        }
        let notification = Notification {
            id: NotificationId::random(),
            recipient: draft.recipient,
            audience: draft.audience,
            title: draft.title.trim().to_owned(),
            message: draft.message.trim().to_owned(),
            kind: draft.kind,
            link: draft.link,
            read_by: Vec::new(),
            created_at: self.clock.utc(),
        };
        self.repo.insert(&notification).await?;

        let delivered = self.broadcaster.publish(notification.to_event());
        debug!(notification_id = %notification.id, delivered, "notification broadcast");
        self.push_to_devices(&notification).await;
        Ok(notification)
    }

    /// Like [`Self::publish`] but never fails the caller.
    pub async fn publish_quietly(&self, draft: NotificationDraft) {
        if let Err(err) = self.publish(draft).await {
            warn!(error = %err, "failed to publish notification");
        }
    }

    async fn push_to_devices(&self, notification: &Notification) {
        let Some(push) = &self.push else {
            return;
        };
        let tokens = match self.device_tokens_for(notification).await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(error = %err, "failed to resolve push recipients");
                return;
            }
        };
        if tokens.is_empty() {
            return;
        }
        let message = PushMessage {
            title: notification.title.clone(),
            body: notification.message.clone(),
            link: notification.link.clone(),
        };
        match push.send(&tokens, &message).await {
            Ok(sent) => debug!(sent, total = tokens.len(), "push delivered"),
            Err(err) => warn!(error = %err, "push delivery failed"),
        }
    }

    async fn device_tokens_for(&self, notification: &Notification) -> Result<Vec<String>, Error> {
        if let Some(recipient) = &notification.recipient {
            let user = self.users.find_by_id(recipient).await?;
            return Ok(user
                .filter(|u| u.is_active)
                .map(|u| u.device_tokens)
                .unwrap_or_default());
        }
        let role = match notification.audience {
            Audience::All => None,
            Audience::Students => Some(UserRole::Student),
            Audience::Admins => Some(UserRole::Admin),
        };
        let users = self.users.push_recipients(role).await?;
        Ok(users.into_iter().flat_map(|u| u.device_tokens).collect())
    }

    /// Newest notifications for `user` with read flags.
    pub async fn inbox(&self, user: &CurrentUser) -> Result<Vec<InboxItem>, Error> {
        let items = self.repo.list_for(user, INBOX_LIMIT).await?;
        Ok(items
            .into_iter()
            .map(|notification| InboxItem {
                read: notification.is_read_by(&user.id),
                notification,
            })
            .collect())
    }

    /// Unread count for `user`.
    pub async fn unread_count(&self, user: &CurrentUser) -> Result<u64, Error> {
        Ok(self.repo.count_unread(user).await?)
    }

    /// Mark one notification as read.
    pub async fn mark_read(&self, user: &CurrentUser, id: &NotificationId) -> Result<(), Error> {
        let notification = self
            .repo
            .find_by_id(id)
            .await?
            .filter(|n| n.is_addressed_to(user))
            .ok_or_else(|| Error::not_found("notification not found"))?;
        if notification.is_read_by(&user.id) {
            return Ok(());
        }
        self.repo.mark_read(id, &user.id).await?;
        Ok(())
    }

    /// Mark everything addressed to `user` as read.
    pub async fn mark_all_read(&self, user: &CurrentUser) -> Result<u64, Error> {
        Ok(self.repo.mark_all_read(user).await?)
    }
}
