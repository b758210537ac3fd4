//! Shared WebSocket adapter state.
//!
//! The socket authenticates through [`AccountService`] and follows events
//! through the [`NotificationFeed`] port, so tests can drive it with the
//! in-memory harness.

use std::sync::Arc;

use url::Url;

use crate::domain::AccountService;
use crate::domain::ports::NotificationFeed;

/// Dependency bundle for the `/ws` endpoint and its sessions.
#[derive(Clone)]
pub struct WsState {
    pub accounts: AccountService,
    pub feed: Arc<dyn NotificationFeed>,
    allowed_origins: Arc<[Url]>,
}

impl WsState {
    /// Construct state; `allowed_origins` mirrors the CORS allow-list.
    pub fn new(
        accounts: AccountService,
        feed: Arc<dyn NotificationFeed>,
        allowed_origins: Vec<Url>,
    ) -> Self {
        Self {
            accounts,
            feed,
            allowed_origins: allowed_origins.into(),
        }
    }

    /// Whether a parsed Origin matches an allowed origin's scheme, host, and port.
    pub fn allows(&self, origin: &Url) -> bool {
        self.allowed_origins
            .iter()
            .any(|allowed| allowed.origin() == origin.origin())
    }
}
