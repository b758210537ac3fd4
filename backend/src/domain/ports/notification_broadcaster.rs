//! Port abstractions for realtime notification fan-out.
use tokio::sync::broadcast;

use crate::domain::NotificationEvent;

/// Port for pushing events to connected sessions.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationBroadcaster: Send + Sync {
    /// Publish `event`. Returns how many subscribers received it.
    fn publish(&self, event: NotificationEvent) -> usize;
}

/// Port the socket adapter uses to follow published events.
pub trait NotificationFeed: Send + Sync {
    /// Receive every event published from now on.
    fn subscribe(&self) -> broadcast::Receiver<NotificationEvent>;
}
