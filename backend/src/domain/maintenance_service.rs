//! Admin control over the maintenance switch.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::warn;

use crate::domain::{
    AuditAction, AuditEntry, AuditRecorder, CurrentUser, MaintenanceMode, MaintenanceStatus,
};

/// Maintenance service.
#[derive(Clone)]
pub struct MaintenanceService {
    mode: Arc<MaintenanceMode>,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl MaintenanceService {
    pub fn new(mode: Arc<MaintenanceMode>, audit: AuditRecorder, clock: Arc<dyn Clock>) -> Self {
        Self { mode, audit, clock }
    }

    /// Shared switch read by the request gate.
    pub fn mode(&self) -> Arc<MaintenanceMode> {
        Arc::clone(&self.mode)
    }

    pub fn status(&self) -> MaintenanceStatus {
        self.mode.status()
    }

    /// Turn maintenance on or off.
    pub async fn set(
        &self,
        admin: &CurrentUser,
        enabled: bool,
        message: Option<String>,
    ) -> MaintenanceStatus {
        let status = self.mode.set(enabled, message, self.clock.utc());
        warn!(enabled, admin_id = %admin.id, "maintenance mode toggled");
        self.audit
            .record(
                AuditEntry::new(AuditAction::MaintenanceToggled, Some(&admin.id))
                    .details(json!({ "enabled": enabled, "message": status.message })),
            )
            .await;
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockAuditLogRepository;
    use crate::domain::test_fixtures::{current, fixture_clock, fixture_timestamp};
    use crate::domain::UserRole;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn toggling_is_audited_and_visible_to_the_gate() {
        let mut audit = MockAuditLogRepository::new();
        audit
            .expect_insert()
            .withf(|log| log.action == AuditAction::MaintenanceToggled.as_str())
            .times(1)
            .returning(|_| Ok(()));
        let service = MaintenanceService::new(
            Arc::new(MaintenanceMode::default()),
            AuditRecorder::new(Arc::new(audit), fixture_clock()),
            fixture_clock(),
        );
        let gate = service.mode();

        let status = service
            .set(&current(UserRole::Admin), true, Some("Exam results upload".into()))
            .await;
        assert!(gate.is_enabled());
        assert_eq!(status.message, "Exam results upload");
        assert_eq!(status.updated_at, Some(fixture_timestamp()));
    }
}
