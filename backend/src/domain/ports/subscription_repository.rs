//! Port abstraction for subscription persistence adapters.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{PageParams, Paginated};

use crate::domain::{PaymentOrderId, Subscription, SubscriptionId, UserId};

use super::RepositoryError;

/// Port for subscriptions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a subscription.
    async fn insert(&self, subscription: &Subscription) -> Result<(), RepositoryError>;

    /// Replace an existing subscription.
    async fn update(&self, subscription: &Subscription) -> Result<(), RepositoryError>;

    /// Fetch by identifier.
    async fn find_by_id(&self, id: &SubscriptionId)
    -> Result<Option<Subscription>, RepositoryError>;

    /// The subscription with the latest end date for `user`, any status.
    async fn latest_for_user(&self, user: &UserId)
    -> Result<Option<Subscription>, RepositoryError>;

    /// Subscriptions for `user` stored as active whose end is after `now`,
    /// earliest start first. Covers the one in force and any queued renewals.
    async fn unexpired_for_user(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, RepositoryError>;

    /// The subscription granted by a payment order.
    async fn find_by_payment_order(
        &self,
        order: &PaymentOrderId,
    ) -> Result<Option<Subscription>, RepositoryError>;

    /// All subscriptions, newest first.
    async fn list(&self, page: PageParams) -> Result<Paginated<Subscription>, RepositoryError>;

    /// Subscriptions in force at `now`.
    async fn count_active(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}
