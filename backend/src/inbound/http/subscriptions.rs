//! Subscription endpoints.
//!
//! ```text
//! GET  /api/subscriptions/me          latest subscription or null
//! POST /api/subscriptions/me/cancel
//! GET  /api/subscriptions             admin
//! ```

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Subscription, SubscriptionStatus, SubscriptionView};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AdminUser, AuthenticatedUser};
use crate::inbound::http::dto::PageParamsQuery;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_page;

/// Subscription as returned to clients. `status` is the effective status,
/// so a lapsed plan reads `expired` even before anything rewrites it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDto {
    pub id: String,
    pub user_id: String,
    #[schema(example = "quarterly")]
    pub plan: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[schema(example = "active")]
    pub status: String,
    pub payment_order_id: Option<String>,
    /// Amount paid in paise.
    pub amount: u64,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionDto {
    pub(crate) fn new(subscription: Subscription, status: SubscriptionStatus) -> Self {
        Self {
            id: subscription.id.to_string(),
            user_id: subscription.user_id.to_string(),
            plan: subscription.plan.as_str().to_owned(),
            starts_at: subscription.starts_at,
            ends_at: subscription.ends_at,
            status: status.as_str().to_owned(),
            payment_order_id: subscription.payment_order_id.map(|id| id.to_string()),
            amount: subscription.amount,
            created_at: subscription.created_at,
        }
    }
}

impl From<SubscriptionView> for SubscriptionDto {
    fn from(view: SubscriptionView) -> Self {
        Self::new(view.subscription, view.status)
    }
}

/// The caller's latest subscription.
#[utoipa::path(
    get,
    path = "/api/subscriptions/me",
    responses(
        (status = 200, description = "Subscription, or null when never subscribed", body = Option<SubscriptionDto>),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "mySubscription"
)]
#[get("/subscriptions/me")]
pub async fn my_subscription(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<Option<SubscriptionDto>>> {
    let current = state.subscriptions.current(&user).await?;
    Ok(web::Json(current.map(SubscriptionDto::from)))
}

/// Cancel the caller's active subscription.
#[utoipa::path(
    post,
    path = "/api/subscriptions/me/cancel",
    responses(
        (status = 200, description = "Cancelled", body = SubscriptionDto),
        (status = 404, description = "No active subscription", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "cancelSubscription"
)]
#[post("/subscriptions/me/cancel")]
pub async fn cancel_subscription(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<SubscriptionDto>> {
    let cancelled = state.subscriptions.cancel(&user).await?;
    Ok(web::Json(cancelled.into()))
}

/// Every subscription, newest first.
#[utoipa::path(
    get,
    path = "/api/subscriptions",
    params(PageParamsQuery),
    responses(
        (status = 200, description = "Subscriptions; items are SubscriptionDto", body = crate::inbound::http::dto::PageSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "listSubscriptions"
)]
#[get("/subscriptions")]
pub async fn list_subscriptions(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    page: web::Query<PageParamsQuery>,
) -> ApiResult<HttpResponse> {
    let page = parse_page(page.into_inner().into())?;
    let subscriptions = state.subscriptions.list(page).await?;
    Ok(HttpResponse::Ok().json(subscriptions.map(SubscriptionDto::from)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use crate::test_support::TestHarness;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;

    #[actix_web::test]
    async fn no_subscription_reads_null_and_cannot_be_cancelled() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::get()
            .uri("/api/subscriptions/me")
            .insert_header(harness.bearer(&student))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, Value::Null);

        let req = test::TestRequest::post()
            .uri("/api/subscriptions/me/cancel")
            .insert_header(harness.bearer(&student))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn listing_is_admin_only() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::get()
            .uri("/api/subscriptions")
            .insert_header(harness.bearer(&student))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = test::TestRequest::get()
            .uri("/api/subscriptions")
            .insert_header(harness.bearer(&admin))
            .to_request();
        let page: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["total"], 0);
    }
}
