//! Best-effort writer for the audit trail.

use std::sync::Arc;

use mockable::Clock;
use pagination::{PageParams, Paginated};
use tracing::warn;

use crate::domain::ports::AuditLogRepository;
use crate::domain::{AuditEntry, AuditLog, AuditLogId, Error};

/// Records audit entries without letting storage failures fail the request.
#[derive(Clone)]
pub struct AuditRecorder {
    repo: Arc<dyn AuditLogRepository>,
    clock: Arc<dyn Clock>,
}

impl AuditRecorder {
    pub fn new(repo: Arc<dyn AuditLogRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Persist `entry`, logging instead of failing on error.
    pub async fn record(&self, entry: AuditEntry) {
        let log = AuditLog {
            id: AuditLogId::random(),
            action: entry.action.as_str().to_owned(),
            actor: entry.actor,
            target: entry.target,
            details: entry.details,
            ip: entry.ip,
            created_at: self.clock.utc(),
        };
        if let Err(err) = self.repo.insert(&log).await {
            warn!(error = %err, action = %log.action, "failed to write audit log");
        }
    }

    /// Admin view of the trail.
    pub async fn list(
        &self,
        action: Option<String>,
        page: PageParams,
    ) -> Result<Paginated<AuditLog>, Error> {
        Ok(self.repo.list(action, page).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuditAction;
    use crate::domain::ports::{MockAuditLogRepository, RepositoryError};
    use crate::domain::test_fixtures::{fixture_clock, fixture_timestamp};
    use crate::domain::UserId;

    #[tokio::test]
    async fn stamps_entries_with_the_clock() {
        let actor = UserId::random();
        let expected_actor = actor.clone();
        let mut repo = MockAuditLogRepository::new();
        repo.expect_insert()
            .withf(move |log| {
                log.action == "material_downloaded"
                    && log.actor.as_ref() == Some(&expected_actor)
                    && log.target.as_deref() == Some("m1")
                    && log.created_at == fixture_timestamp()
            })
            .times(1)
            .returning(|_| Ok(()));

        AuditRecorder::new(Arc::new(repo), fixture_clock())
            .record(AuditEntry::new(AuditAction::MaterialDownloaded, Some(&actor)).target("m1"))
            .await;
    }

    #[tokio::test]
    async fn swallows_storage_failures() {
        let mut repo = MockAuditLogRepository::new();
        repo.expect_insert()
            .times(1)
            .returning(|_| Err(RepositoryError::connection("down")));

        AuditRecorder::new(Arc::new(repo), fixture_clock())
            .record(AuditEntry::new(AuditAction::UserLoggedIn, None))
            .await;
    }
}
