//! Payment orders, subscriptions, and courses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{PageParams, Paginated};

use crate::domain::ports::{
    CourseRepository, PaymentRepository, RepositoryError, SubscriptionRepository,
};
use crate::domain::{
    Branch, Course, CourseId, PaymentOrder, PaymentOrderId, PaymentPurpose, PaymentStatus,
    Subscription, SubscriptionId, SubscriptionStatus, UserId,
};

use super::Collection;

/// In-memory [`PaymentRepository`].
#[derive(Default)]
pub struct MemoryPaymentRepository {
    orders: Collection<PaymentOrder>,
}

#[async_trait]
impl PaymentRepository for MemoryPaymentRepository {
    async fn insert(&self, order: &PaymentOrder) -> Result<(), RepositoryError> {
        self.orders.insert(order).await
    }

    async fn update(&self, order: &PaymentOrder) -> Result<(), RepositoryError> {
        self.orders.replace(order).await
    }

    async fn find_by_id(
        &self,
        id: &PaymentOrderId,
    ) -> Result<Option<PaymentOrder>, RepositoryError> {
        Ok(self.orders.get(id.as_ref()).await)
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentOrder>, RepositoryError> {
        Ok(self
            .orders
            .find(|o| o.gateway_order_id.as_deref() == Some(gateway_order_id))
            .await)
    }

    async fn find_by_payment_link_id(
        &self,
        link_id: &str,
    ) -> Result<Option<PaymentOrder>, RepositoryError> {
        Ok(self
            .orders
            .find(|o| o.payment_link_id.as_deref() == Some(link_id))
            .await)
    }

    async fn list(
        &self,
        user: Option<UserId>,
        page: PageParams,
    ) -> Result<Paginated<PaymentOrder>, RepositoryError> {
        Ok(self
            .orders
            .page(|o| user.as_ref().is_none_or(|u| &o.user_id == u), page)
            .await)
    }

    async fn has_paid_for(
        &self,
        user: &UserId,
        purpose: &PaymentPurpose,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .orders
            .find(|o| &o.user_id == user && &o.purpose == purpose && o.is_paid())
            .await
            .is_some())
    }

    async fn total_revenue(&self) -> Result<u64, RepositoryError> {
        Ok(self
            .orders
            .sum(|o| o.status == PaymentStatus::Paid, |o| o.amount)
            .await)
    }
}

/// In-memory [`SubscriptionRepository`].
#[derive(Default)]
pub struct MemorySubscriptionRepository {
    subscriptions: Collection<Subscription>,
}

#[async_trait]
impl SubscriptionRepository for MemorySubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), RepositoryError> {
        self.subscriptions.insert(subscription).await
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), RepositoryError> {
        self.subscriptions.replace(subscription).await
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        Ok(self.subscriptions.get(id.as_ref()).await)
    }

    async fn latest_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        Ok(self
            .subscriptions
            .newest(|s| &s.user_id == user)
            .await
            .into_iter()
            .next())
    }

    async fn unexpired_for_user(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, RepositoryError> {
        let mut unexpired = self
            .subscriptions
            .newest(|s| {
                &s.user_id == user
                    && s.status == SubscriptionStatus::Active
                    && s.ends_at > now
            })
            .await;
        unexpired.sort_by_key(|s| s.starts_at);
        Ok(unexpired)
    }

    async fn find_by_payment_order(
        &self,
        order: &PaymentOrderId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        Ok(self
            .subscriptions
            .find(|s| s.payment_order_id.as_ref() == Some(order))
            .await)
    }

    async fn list(&self, page: PageParams) -> Result<Paginated<Subscription>, RepositoryError> {
        Ok(self.subscriptions.page(|_| true, page).await)
    }

    async fn count_active(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        Ok(self.subscriptions.count(|s| s.is_active_at(now)).await)
    }
}

/// In-memory [`CourseRepository`].
#[derive(Default)]
pub struct MemoryCourseRepository {
    courses: Collection<Course>,
}

#[async_trait]
impl CourseRepository for MemoryCourseRepository {
    async fn insert(&self, course: &Course) -> Result<(), RepositoryError> {
        self.courses.insert(course).await
    }

    async fn update(&self, course: &Course) -> Result<(), RepositoryError> {
        self.courses.replace(course).await
    }

    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(self.courses.get(id.as_ref()).await)
    }

    async fn list_active(&self, branch: Option<Branch>) -> Result<Vec<Course>, RepositoryError> {
        Ok(self
            .courses
            .newest(|c| {
                c.is_active
                    && branch.as_ref().is_none_or(|wanted| {
                        c.branch.as_ref().is_none_or(|own| own.matches(wanted))
                    })
            })
            .await)
    }

    async fn delete(&self, id: &CourseId) -> Result<bool, RepositoryError> {
        Ok(self.courses.remove(id.as_ref()).await)
    }

    async fn add_student(&self, id: &CourseId, student: &UserId) -> Result<bool, RepositoryError> {
        let added = self
            .courses
            .modify(
                |c| &c.id == id,
                |c| {
                    if c.has_student(student) {
                        return false;
                    }
                    c.enrolled_students.push(student.clone());
                    true
                },
            )
            .await;
        Ok(added > 0)
    }
}
