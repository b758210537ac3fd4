//! Maintenance mode: a global switch that parks non-admin API traffic.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

/// Message shown when none has been configured.
pub const DEFAULT_MAINTENANCE_MESSAGE: &str =
    "DigiDiploma is undergoing scheduled maintenance. Please try again shortly.";

/// Paths that stay reachable while maintenance is on.
const EXEMPT_EXACT: [&str; 3] = [
    "/api/users/login",
    "/api/users/refresh-token",
    "/api/maintenance/status",
];
const EXEMPT_PREFIXES: [&str; 1] = ["/health/"];

/// Whether `path` bypasses the maintenance gate for everyone.
///
/// # Examples
/// ```
/// use digidiploma::domain::is_maintenance_exempt;
///
/// assert!(is_maintenance_exempt("/api/users/login"));
/// assert!(is_maintenance_exempt("/health/ready"));
/// assert!(!is_maintenance_exempt("/api/materials"));
/// ```
pub fn is_maintenance_exempt(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    EXEMPT_EXACT.contains(&path)
        || EXEMPT_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix) || format!("{path}/") == *prefix)
}

/// Snapshot returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceStatus {
    pub enabled: bool,
    pub message: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct Details {
    message: String,
    updated_at: Option<DateTime<Utc>>,
}

/// Process-wide maintenance flag shared by the gate and the admin endpoint.
#[derive(Debug)]
pub struct MaintenanceMode {
    enabled: AtomicBool,
    details: RwLock<Details>,
}

impl MaintenanceMode {
    /// Create the switch in the given initial state.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            details: RwLock::new(Details {
                message: DEFAULT_MAINTENANCE_MESSAGE.to_owned(),
                updated_at: None,
            }),
        }
    }

    /// Whether the gate is currently closed.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Flip the switch, optionally replacing the message.
    pub fn set(&self, enabled: bool, message: Option<String>, now: DateTime<Utc>) -> MaintenanceStatus {
        {
            let mut details = self
                .details
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
                details.message = message.trim().to_owned();
            }
            details.updated_at = Some(now);
        }
        self.enabled.store(enabled, Ordering::Release);
        self.status()
    }

    /// Current state.
    pub fn status(&self) -> MaintenanceStatus {
        let details = self
            .details
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        MaintenanceStatus {
            enabled: self.is_enabled(),
            message: details.message,
            updated_at: details.updated_at,
        }
    }
}

impl Default for MaintenanceMode {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/api/users/login", true)]
    #[case("/api/users/login/", true)]
    #[case("/api/users/refresh-token", true)]
    #[case("/api/maintenance/status", true)]
    #[case("/health/live", true)]
    #[case("/health", true)]
    #[case("/api/users/register", false)]
    #[case("/api/maintenance", false)]
    #[case("/healthz", false)]
    fn exemptions(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_maintenance_exempt(path), expected);
    }

    #[rstest]
    fn set_updates_message_and_flag() {
        let mode = MaintenanceMode::new(false);
        let now = Utc::now();
        let status = mode.set(true, Some("  Back at 6pm ".into()), now);
        assert!(status.enabled);
        assert_eq!(status.message, "Back at 6pm");
        assert_eq!(status.updated_at, Some(now));
        let status = mode.set(false, Some("   ".into()), now);
        assert!(!status.enabled);
        assert_eq!(status.message, "Back at 6pm");
    }
}
