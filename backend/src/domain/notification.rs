//! In-app notifications and the realtime event pushed to connected clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Audience, CurrentUser, NotificationId, UserId};

/// Category shown as an icon in the SPA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Notice,
    Material,
    Payment,
    System,
}

impl NotificationKind {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Material => "material",
            Self::Payment => "payment",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "notice" => Ok(Self::Notice),
            "material" => Ok(Self::Material),
            "payment" => Ok(Self::Payment),
            "system" => Ok(Self::System),
            _ => Err(()),
        }
    }
}

/// Persisted notification. No recipient means broadcast to the audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: Option<UserId>,
    pub audience: Audience,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
    pub read_by: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Whether `user` should receive this notification.
    pub fn is_addressed_to(&self, user: &CurrentUser) -> bool {
        match &self.recipient {
            Some(recipient) => recipient == &user.id,
            None => user.is_admin() || self.audience.admits(Some(user)),
        }
    }

    /// Whether `user` has already read it.
    pub fn is_read_by(&self, user: &UserId) -> bool {
        self.read_by.contains(user)
    }

    /// Realtime payload for this notification.
    pub fn to_event(&self) -> NotificationEvent {
        NotificationEvent {
            id: self.id.clone(),
            recipient: self.recipient.clone(),
            audience: self.audience,
            title: self.title.clone(),
            message: self.message.clone(),
            kind: self.kind,
            link: self.link.clone(),
            created_at: self.created_at,
        }
    }
}

/// Fields for a new notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub recipient: Option<UserId>,
    pub audience: Audience,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
}

/// Event fanned out to WebSocket sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub id: NotificationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<UserId>,
    pub audience: Audience,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Routing rule shared with [`Notification::is_addressed_to`].
    pub fn is_addressed_to(&self, user: &CurrentUser) -> bool {
        match &self.recipient {
            Some(recipient) => recipient == &user.id,
            None => user.is_admin() || self.audience.admits(Some(user)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Email, UserRole};
    use rstest::rstest;

    fn user(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::random(),
            name: "Ada".into(),
            email: Email::new("ada@example.com").expect("email"),
            role,
            branch: None,
            semester: None,
        }
    }

    fn notification(recipient: Option<UserId>, audience: Audience) -> Notification {
        Notification {
            id: NotificationId::random(),
            recipient,
            audience,
            title: "New notes".into(),
            message: "Unit 3 uploaded".into(),
            kind: NotificationKind::Material,
            link: None,
            read_by: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[rstest]
    fn direct_notifications_only_reach_recipient() {
        let me = user(UserRole::Student);
        let other = user(UserRole::Student);
        let n = notification(Some(me.id.clone()), Audience::All);
        assert!(n.is_addressed_to(&me));
        assert!(!n.is_addressed_to(&other));
    }

    #[rstest]
    #[case(Audience::All, UserRole::Student, true)]
    #[case(Audience::Students, UserRole::Student, true)]
    #[case(Audience::Admins, UserRole::Student, false)]
    #[case(Audience::Admins, UserRole::Admin, true)]
    fn broadcasts_follow_audience(
        #[case] audience: Audience,
        #[case] role: UserRole,
        #[case] expected: bool,
    ) {
        let n = notification(None, audience);
        assert_eq!(n.is_addressed_to(&user(role)), expected);
        assert_eq!(n.to_event().is_addressed_to(&user(role)), expected);
    }
}
