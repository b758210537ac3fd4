//! Subscription queries and self-service cancellation.

use std::sync::Arc;

use mockable::Clock;
use pagination::{PageParams, Paginated};

use crate::domain::ports::SubscriptionRepository;
use crate::domain::{
    AuditAction, AuditEntry, AuditRecorder, CurrentUser, Error, Subscription,
    SubscriptionCoverage, SubscriptionStatus,
};

/// Subscription with its status as of now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionView {
    pub subscription: Subscription,
    pub status: SubscriptionStatus,
}

/// Subscription service.
#[derive(Clone)]
pub struct SubscriptionService {
    repo: Arc<dyn SubscriptionRepository>,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl SubscriptionService {
    pub fn new(
        repo: Arc<dyn SubscriptionRepository>,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { repo, audit, clock }
    }

    fn view(&self, subscription: Subscription) -> SubscriptionView {
        SubscriptionView {
            status: subscription.effective_status(self.clock.utc()),
            subscription,
        }
    }

    async fn coverage(&self, user: &CurrentUser) -> Result<SubscriptionCoverage, Error> {
        let now = self.clock.utc();
        Ok(SubscriptionCoverage::new(
            self.repo.unexpired_for_user(&user.id, now).await?,
        ))
    }

    /// The subscription in force for the caller, falling back to the most
    /// recent one so lapsed subscribers still see their history.
    pub async fn current(&self, user: &CurrentUser) -> Result<Option<SubscriptionView>, Error> {
        let now = self.clock.utc();
        let coverage = self.coverage(user).await?;
        if let Some(subscription) = coverage.in_force(now) {
            return Ok(Some(self.view(subscription.clone())));
        }
        Ok(self
            .repo
            .latest_for_user(&user.id)
            .await?
            .map(|s| self.view(s)))
    }

    /// Cancel the caller's subscription in force along with queued renewals.
    pub async fn cancel(&self, user: &CurrentUser) -> Result<SubscriptionView, Error> {
        let now = self.clock.utc();
        let coverage = self.coverage(user).await?;
        let current = coverage
            .in_force(now)
            .cloned()
            .ok_or_else(|| Error::not_found("No active subscription"))?;
        let mut cancelled = None;
        for subscription in coverage.remaining(now) {
            let mut subscription = subscription.clone();
            subscription.status = SubscriptionStatus::Cancelled;
            subscription.updated_at = now;
            self.repo.update(&subscription).await?;
            self.audit
                .record(
                    AuditEntry::new(AuditAction::SubscriptionCancelled, Some(&user.id))
                        .target(&subscription.id),
                )
                .await;
            if subscription.id == current.id {
                cancelled = Some(subscription);
            }
        }
        let subscription = cancelled.unwrap_or(current);
        Ok(self.view(subscription))
    }

    /// Admin listing.
    pub async fn list(&self, page: PageParams) -> Result<Paginated<SubscriptionView>, Error> {
        let page = self.repo.list(page).await?;
        Ok(page.map(|s| self.view(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockAuditLogRepository, MockSubscriptionRepository};
    use crate::domain::test_fixtures::{current, fixture_clock, fixture_timestamp};
    use crate::domain::{SubscriptionPlan, UserRole};
    use chrono::Duration;
    use rstest::rstest;

    fn service(repo: MockSubscriptionRepository) -> SubscriptionService {
        let mut audit = MockAuditLogRepository::new();
        audit.expect_insert().returning(|_| Ok(()));
        SubscriptionService::new(
            Arc::new(repo),
            AuditRecorder::new(Arc::new(audit), fixture_clock()),
            fixture_clock(),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn reports_expired_status_after_end_date() {
        let user = current(UserRole::Student);
        let owner = user.id.clone();
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_unexpired_for_user().returning(|_, _| Ok(Vec::new()));
        repo.expect_latest_for_user().returning(move |_| {
            Ok(Some(Subscription::start(
                owner.clone(),
                SubscriptionPlan::Monthly,
                fixture_timestamp() - Duration::days(31),
                None,
                None,
            )))
        });

        let view = service(repo)
            .current(&user)
            .await
            .expect("lookup")
            .expect("subscription present");
        assert_eq!(view.subscription.status, SubscriptionStatus::Active);
        assert_eq!(view.status, SubscriptionStatus::Expired);
    }

    #[rstest]
    #[tokio::test]
    async fn cancel_requires_an_active_subscription() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_unexpired_for_user().returning(|_, _| Ok(Vec::new()));
        repo.expect_update().times(0);

        let err = service(repo)
            .cancel(&current(UserRole::Student))
            .await
            .expect_err("nothing to cancel");
        assert_eq!(err.code(), crate::domain::ErrorCode::NotFound);
    }

    fn early_renewal(owner: &crate::domain::UserId) -> (Subscription, Subscription) {
        let first = Subscription::start(
            owner.clone(),
            SubscriptionPlan::Monthly,
            fixture_timestamp() - Duration::days(10),
            None,
            None,
        );
        let renewal = Subscription::start(
            owner.clone(),
            SubscriptionPlan::Monthly,
            fixture_timestamp(),
            Some(first.ends_at),
            None,
        );
        (first, renewal)
    }

    #[rstest]
    #[tokio::test]
    async fn current_prefers_the_subscription_in_force_over_a_queued_renewal() {
        let user = current(UserRole::Student);
        let (first, renewal) = early_renewal(&user.id);
        let first_id = first.id.clone();
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_unexpired_for_user()
            .returning(move |_, _| Ok(vec![renewal.clone(), first.clone()]));
        repo.expect_latest_for_user().times(0);

        let view = service(repo)
            .current(&user)
            .await
            .expect("lookup")
            .expect("subscription present");
        assert_eq!(view.subscription.id, first_id);
        assert_eq!(view.status, SubscriptionStatus::Active);
    }

    #[rstest]
    #[tokio::test]
    async fn cancel_also_cancels_queued_renewals() {
        let user = current(UserRole::Student);
        let (first, renewal) = early_renewal(&user.id);
        let first_id = first.id.clone();
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_unexpired_for_user()
            .returning(move |_, _| Ok(vec![first.clone(), renewal.clone()]));
        repo.expect_update()
            .times(2)
            .withf(|s| s.status == SubscriptionStatus::Cancelled)
            .returning(|_| Ok(()));

        let view = service(repo).cancel(&user).await.expect("cancelled");
        assert_eq!(view.subscription.id, first_id);
        assert_eq!(view.status, SubscriptionStatus::Cancelled);
    }
}
