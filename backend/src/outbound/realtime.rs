//! In-process fan-out of notification events to WebSocket sessions.

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::NotificationEvent;
use crate::domain::ports::{NotificationBroadcaster, NotificationFeed};

/// Events buffered per subscriber before slow sessions start lagging.
pub const HUB_CAPACITY: usize = 256;

/// Broadcast hub shared by the notification service and every socket.
///
/// Each session subscribes and filters events with
/// [`NotificationEvent::is_addressed_to`]; the hub itself does no routing.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<NotificationEvent>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Number of connected sessions.
    pub fn session_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(HUB_CAPACITY)
    }
}

impl NotificationFeed for NotificationHub {
    fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }
}

impl NotificationBroadcaster for NotificationHub {
    fn publish(&self, event: NotificationEvent) -> usize {
        // Sending with no subscribers is an error we can ignore.
        let delivered = self.sender.send(event).unwrap_or(0);
        debug!(delivered, "published notification event");
        delivered
    }
}
