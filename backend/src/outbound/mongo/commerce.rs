//! Payment order, subscription, and course documents.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::Collection;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Document, doc};
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{
    CourseRepository, PaymentRepository, RepositoryError, SubscriptionRepository,
};
use crate::domain::{
    Branch, Course, CourseId, PaymentOrder, PaymentOrderId, PaymentPurpose, PaymentStatus,
    Subscription, SubscriptionId, SubscriptionPlan, SubscriptionStatus, UserId,
};

use super::MongoDatabase;
use super::bson_helpers::{
    convert_page, equals_ignore_case, find_all, find_page, from_bson_date, id_from, ids_from,
    newest_first, oid, oid_opt, sum_field, to_bson, to_bson_date,
};
use super::error_mapping::{map_driver_error, query_error};

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    user_id: ObjectId,
    purpose: PaymentPurpose,
    amount: i64,
    currency: String,
    receipt: String,
    /// Absent rather than null so the sparse unique index ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gateway_order_id: Option<String>,
    gateway_payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payment_link_id: Option<String>,
    payment_link_url: Option<String>,
    status: PaymentStatus,
    refund_id: Option<String>,
    failure_reason: Option<String>,
    paid_at: Option<bson::DateTime>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl PaymentDocument {
    fn from_domain(order: &PaymentOrder) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&order.id)?,
            user_id: oid(&order.user_id)?,
            purpose: order.purpose.clone(),
            amount: to_i64(order.amount),
            currency: order.currency.clone(),
            receipt: order.receipt.clone(),
            gateway_order_id: order.gateway_order_id.clone(),
            gateway_payment_id: order.gateway_payment_id.clone(),
            payment_link_id: order.payment_link_id.clone(),
            payment_link_url: order.payment_link_url.clone(),
            status: order.status,
            refund_id: order.refund_id.clone(),
            failure_reason: order.failure_reason.clone(),
            paid_at: order.paid_at.map(to_bson_date),
            created_at: to_bson_date(order.created_at),
            updated_at: to_bson_date(order.updated_at),
        })
    }

    fn into_domain(self) -> Result<PaymentOrder, RepositoryError> {
        Ok(PaymentOrder {
            id: id_from(self.id)?,
            user_id: id_from(self.user_id)?,
            purpose: self.purpose,
            amount: to_u64(self.amount),
            currency: self.currency,
            receipt: self.receipt,
            gateway_order_id: self.gateway_order_id,
            gateway_payment_id: self.gateway_payment_id,
            payment_link_id: self.payment_link_id,
            payment_link_url: self.payment_link_url,
            status: self.status,
            refund_id: self.refund_id,
            failure_reason: self.failure_reason,
            paid_at: self.paid_at.map(from_bson_date),
            created_at: from_bson_date(self.created_at),
            updated_at: from_bson_date(self.updated_at),
        })
    }
}

/// MongoDB-backed [`PaymentRepository`].
#[derive(Clone)]
pub struct MongoPaymentRepository {
    orders: Collection<PaymentDocument>,
}

impl MongoPaymentRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            orders: db.collection("payments"),
        }
    }

    async fn find_one(&self, filter: Document) -> Result<Option<PaymentOrder>, RepositoryError> {
        self.orders
            .find_one(filter)
            .await
            .map_err(query_error)?
            .map(PaymentDocument::into_domain)
            .transpose()
    }
}

#[async_trait]
impl PaymentRepository for MongoPaymentRepository {
    async fn insert(&self, order: &PaymentOrder) -> Result<(), RepositoryError> {
        self.orders
            .insert_one(PaymentDocument::from_domain(order)?)
            .await
            .map(drop)
            .map_err(|err| map_driver_error(&err, "gatewayOrderId"))
    }

    async fn update(&self, order: &PaymentOrder) -> Result<(), RepositoryError> {
        let document = PaymentDocument::from_domain(order)?;
        self.orders
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map(drop)
            .map_err(|err| map_driver_error(&err, "gatewayOrderId"))
    }

    async fn find_by_id(
        &self,
        id: &PaymentOrderId,
    ) -> Result<Option<PaymentOrder>, RepositoryError> {
        self.find_one(doc! { "_id": oid(id)? }).await
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentOrder>, RepositoryError> {
        self.find_one(doc! { "gatewayOrderId": gateway_order_id }).await
    }

    async fn find_by_payment_link_id(
        &self,
        link_id: &str,
    ) -> Result<Option<PaymentOrder>, RepositoryError> {
        self.find_one(doc! { "paymentLinkId": link_id }).await
    }

    async fn list(
        &self,
        user: Option<UserId>,
        page: PageParams,
    ) -> Result<Paginated<PaymentOrder>, RepositoryError> {
        let mut filter = Document::new();
        if let Some(user) = oid_opt(user.as_ref())? {
            filter.insert("userId", user);
        }
        let page = find_page(&self.orders, filter, page).await?;
        convert_page(page, PaymentDocument::into_domain)
    }

    async fn has_paid_for(
        &self,
        user: &UserId,
        purpose: &PaymentPurpose,
    ) -> Result<bool, RepositoryError> {
        let count = self
            .orders
            .count_documents(doc! {
                "userId": oid(user)?,
                "purpose": to_bson(purpose)?,
                "status": PaymentStatus::Paid.as_str(),
            })
            .await
            .map_err(query_error)?;
        Ok(count > 0)
    }

    async fn total_revenue(&self) -> Result<u64, RepositoryError> {
        sum_field(
            &self.orders,
            doc! { "status": PaymentStatus::Paid.as_str() },
            "amount",
        )
        .await
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    user_id: ObjectId,
    plan: SubscriptionPlan,
    starts_at: bson::DateTime,
    ends_at: bson::DateTime,
    status: SubscriptionStatus,
    payment_order_id: Option<ObjectId>,
    amount: i64,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl SubscriptionDocument {
    fn from_domain(subscription: &Subscription) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&subscription.id)?,
            user_id: oid(&subscription.user_id)?,
            plan: subscription.plan,
            starts_at: to_bson_date(subscription.starts_at),
            ends_at: to_bson_date(subscription.ends_at),
            status: subscription.status,
            payment_order_id: oid_opt(subscription.payment_order_id.as_ref())?,
            amount: to_i64(subscription.amount),
            created_at: to_bson_date(subscription.created_at),
            updated_at: to_bson_date(subscription.updated_at),
        })
    }

    fn into_domain(self) -> Result<Subscription, RepositoryError> {
        Ok(Subscription {
            id: id_from(self.id)?,
            user_id: id_from(self.user_id)?,
            plan: self.plan,
            starts_at: from_bson_date(self.starts_at),
            ends_at: from_bson_date(self.ends_at),
            status: self.status,
            payment_order_id: self.payment_order_id.map(id_from).transpose()?,
            amount: to_u64(self.amount),
            created_at: from_bson_date(self.created_at),
            updated_at: from_bson_date(self.updated_at),
        })
    }
}

/// MongoDB-backed [`SubscriptionRepository`].
#[derive(Clone)]
pub struct MongoSubscriptionRepository {
    subscriptions: Collection<SubscriptionDocument>,
}

impl MongoSubscriptionRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            subscriptions: db.collection("subscriptions"),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for MongoSubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), RepositoryError> {
        self.subscriptions
            .insert_one(SubscriptionDocument::from_domain(subscription)?)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), RepositoryError> {
        let document = SubscriptionDocument::from_domain(subscription)?;
        self.subscriptions
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        self.subscriptions
            .find_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?
            .map(SubscriptionDocument::into_domain)
            .transpose()
    }

    async fn latest_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        self.subscriptions
            .find_one(doc! { "userId": oid(user)? })
            .sort(newest_first())
            .await
            .map_err(query_error)?
            .map(SubscriptionDocument::into_domain)
            .transpose()
    }

    async fn unexpired_for_user(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, RepositoryError> {
        let filter = doc! {
            "userId": oid(user)?,
            "status": SubscriptionStatus::Active.as_str(),
            "endsAt": { "$gt": to_bson_date(now) },
        };
        let mut unexpired = find_all(&self.subscriptions, filter, None)
            .await?
            .into_iter()
            .map(SubscriptionDocument::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        unexpired.sort_by_key(|s| s.starts_at);
        Ok(unexpired)
    }

    async fn find_by_payment_order(
        &self,
        order: &PaymentOrderId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        self.subscriptions
            .find_one(doc! { "paymentOrderId": oid(order)? })
            .await
            .map_err(query_error)?
            .map(SubscriptionDocument::into_domain)
            .transpose()
    }

    async fn list(&self, page: PageParams) -> Result<Paginated<Subscription>, RepositoryError> {
        let page = find_page(&self.subscriptions, Document::new(), page).await?;
        convert_page(page, SubscriptionDocument::into_domain)
    }

    async fn count_active(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let now = to_bson_date(now);
        self.subscriptions
            .count_documents(doc! {
                "status": "active",
                "startsAt": { "$lte": now },
                "endsAt": { "$gt": now },
            })
            .await
            .map_err(query_error)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    description: String,
    branch: Option<Branch>,
    instructor: Option<String>,
    duration: Option<String>,
    price: i64,
    thumbnail_url: Option<String>,
    #[serde(default)]
    enrolled_students: Vec<ObjectId>,
    is_active: bool,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl CourseDocument {
    fn from_domain(course: &Course) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: oid(&course.id)?,
            title: course.title.clone(),
            description: course.description.clone(),
            branch: course.branch.clone(),
            instructor: course.instructor.clone(),
            duration: course.duration.clone(),
            price: to_i64(course.price),
            thumbnail_url: course.thumbnail_url.clone(),
            enrolled_students: course
                .enrolled_students
                .iter()
                .map(oid)
                .collect::<Result<_, _>>()?,
            is_active: course.is_active,
            created_at: to_bson_date(course.created_at),
            updated_at: to_bson_date(course.updated_at),
        })
    }

    fn into_domain(self) -> Result<Course, RepositoryError> {
        Ok(Course {
            id: id_from(self.id)?,
            title: self.title,
            description: self.description,
            branch: self.branch,
            instructor: self.instructor,
            duration: self.duration,
            price: to_u64(self.price),
            thumbnail_url: self.thumbnail_url,
            enrolled_students: ids_from(self.enrolled_students)?,
            is_active: self.is_active,
            created_at: from_bson_date(self.created_at),
            updated_at: from_bson_date(self.updated_at),
        })
    }
}

/// Active courses, optionally narrowed to one branch. Courses without a
/// branch are offered to every branch.
fn course_filter(branch: Option<&Branch>) -> Document {
    let mut filter = doc! { "isActive": true };
    if let Some(branch) = branch {
        filter.insert(
            "$or",
            vec![
                doc! { "branch": null },
                doc! { "branch": equals_ignore_case(branch.as_ref()) },
            ],
        );
    }
    filter
}

/// MongoDB-backed [`CourseRepository`].
#[derive(Clone)]
pub struct MongoCourseRepository {
    courses: Collection<CourseDocument>,
}

impl MongoCourseRepository {
    pub fn new(db: &MongoDatabase) -> Self {
        Self {
            courses: db.collection("courses"),
        }
    }
}

#[async_trait]
impl CourseRepository for MongoCourseRepository {
    async fn insert(&self, course: &Course) -> Result<(), RepositoryError> {
        self.courses
            .insert_one(CourseDocument::from_domain(course)?)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn update(&self, course: &Course) -> Result<(), RepositoryError> {
        let document = CourseDocument::from_domain(course)?;
        self.courses
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map(drop)
            .map_err(query_error)
    }

    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        self.courses
            .find_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?
            .map(CourseDocument::into_domain)
            .transpose()
    }

    async fn list_active(&self, branch: Option<Branch>) -> Result<Vec<Course>, RepositoryError> {
        find_all(&self.courses, course_filter(branch.as_ref()), None)
            .await?
            .into_iter()
            .map(CourseDocument::into_domain)
            .collect()
    }

    async fn delete(&self, id: &CourseId) -> Result<bool, RepositoryError> {
        let result = self
            .courses
            .delete_one(doc! { "_id": oid(id)? })
            .await
            .map_err(query_error)?;
        Ok(result.deleted_count > 0)
    }

    async fn add_student(&self, id: &CourseId, student: &UserId) -> Result<bool, RepositoryError> {
        let result = self
            .courses
            .update_one(
                doc! { "_id": oid(id)? },
                doc! { "$addToSet": { "enrolledStudents": oid(student)? } },
            )
            .await
            .map_err(query_error)?;
        Ok(result.modified_count > 0)
    }
}
