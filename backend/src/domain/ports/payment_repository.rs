//! Port abstraction for payment order persistence adapters.
use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use crate::domain::{PaymentOrder, PaymentOrderId, PaymentPurpose, UserId};

use super::RepositoryError;

/// Port for payment orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert an order.
    async fn insert(&self, order: &PaymentOrder) -> Result<(), RepositoryError>;

    /// Replace an existing order.
    async fn update(&self, order: &PaymentOrder) -> Result<(), RepositoryError>;

    /// Fetch by identifier.
    async fn find_by_id(&self, id: &PaymentOrderId)
    -> Result<Option<PaymentOrder>, RepositoryError>;

    /// Fetch by the gateway's order id.
    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentOrder>, RepositoryError>;

    /// Fetch by hosted payment link id.
    async fn find_by_payment_link_id(
        &self,
        link_id: &str,
    ) -> Result<Option<PaymentOrder>, RepositoryError>;

    /// Orders, newest first, optionally for one user.
    async fn list(
        &self,
        user: Option<UserId>,
        page: PageParams,
    ) -> Result<Paginated<PaymentOrder>, RepositoryError>;

    /// Whether `user` has a paid order for `purpose`.
    async fn has_paid_for(
        &self,
        user: &UserId,
        purpose: &PaymentPurpose,
    ) -> Result<bool, RepositoryError>;

    /// Sum of paid order amounts, in paise.
    async fn total_revenue(&self) -> Result<u64, RepositoryError>;
}
