//! Admin analytics and the student dashboard.
//!
//! ```text
//! GET /api/analytics/overview        admin
//! GET /api/analytics/logs?action=    admin, paginated audit trail
//! GET /api/dashboard                 signed-in user
//! ```

use actix_web::{HttpResponse, get, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::user::optional_text;
use crate::domain::{
    AnalyticsOverview, AuditLog, StudentDashboard, SubscriptionStatus, TopMaterial,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AdminUser, AuthenticatedUser};
use crate::inbound::http::dto::PageParamsQuery;
use crate::inbound::http::materials::MaterialDto;
use crate::inbound::http::notices::NoticeDto;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::subscriptions::SubscriptionDto;
use crate::inbound::http::validation::parse_page;

/// Leaderboard row.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopMaterialDto {
    pub id: String,
    pub title: String,
    pub subject_code: String,
    pub downloads: u64,
}

impl From<TopMaterial> for TopMaterialDto {
    fn from(top: TopMaterial) -> Self {
        Self {
            id: top.id.to_string(),
            title: top.title,
            subject_code: top.subject_code.into(),
            downloads: top.downloads,
        }
    }
}

/// Headline numbers for the admin console.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverviewDto {
    pub total_users: u64,
    pub students: u64,
    pub admins: u64,
    pub materials: u64,
    pub subjects: u64,
    pub active_notices: u64,
    pub active_subscriptions: u64,
    /// Paise collected across paid orders.
    pub revenue: u64,
    pub downloads: u64,
    pub top_materials: Vec<TopMaterialDto>,
}

impl From<AnalyticsOverview> for OverviewDto {
    fn from(stats: AnalyticsOverview) -> Self {
        Self {
            total_users: stats.total_users,
            students: stats.students,
            admins: stats.admins,
            materials: stats.materials,
            subjects: stats.subjects,
            active_notices: stats.active_notices,
            active_subscriptions: stats.active_subscriptions,
            revenue: stats.revenue,
            downloads: stats.downloads,
            top_materials: stats
                .top_materials
                .into_iter()
                .map(TopMaterialDto::from)
                .collect(),
        }
    }
}

/// Audit trail entry.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogDto {
    pub id: String,
    #[schema(example = "material_downloaded")]
    pub action: String,
    pub actor_id: Option<String>,
    pub target: Option<String>,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLog> for AuditLogDto {
    fn from(log: AuditLog) -> Self {
        Self {
            id: log.id.to_string(),
            action: log.action,
            actor_id: log.actor.map(|id| id.to_string()),
            target: log.target,
            details: log.details,
            ip: log.ip,
            created_at: log.created_at,
        }
    }
}

/// Student landing page.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDto {
    pub material_count: u64,
    pub recent_materials: Vec<MaterialDto>,
    pub notices: Vec<NoticeDto>,
    /// Present only while a plan is active.
    pub subscription: Option<SubscriptionDto>,
    pub unread_notifications: u64,
}

impl From<StudentDashboard> for DashboardDto {
    fn from(board: StudentDashboard) -> Self {
        Self {
            material_count: board.material_count,
            recent_materials: board
                .recent_materials
                .into_iter()
                .map(MaterialDto::from)
                .collect(),
            notices: board.notices.into_iter().map(NoticeDto::from).collect(),
            subscription: board
                .subscription
                .map(|s| SubscriptionDto::new(s, SubscriptionStatus::Active)),
            unread_notifications: board.unread_notifications,
        }
    }
}

/// `?action=` filter for the audit trail.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditLogQuery {
    #[param(example = "user_logged_in")]
    pub action: Option<String>,
}

/// Platform-wide counters.
#[utoipa::path(
    get,
    path = "/api/analytics/overview",
    responses(
        (status = 200, description = "Overview", body = OverviewDto),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["analytics"],
    operation_id = "analyticsOverview"
)]
#[get("/analytics/overview")]
pub async fn overview(
    state: web::Data<HttpState>,
    _admin: AdminUser,
) -> ApiResult<web::Json<OverviewDto>> {
    let stats = state.analytics.overview().await?;
    Ok(web::Json(stats.into()))
}

/// Audit trail, newest first.
#[utoipa::path(
    get,
    path = "/api/analytics/logs",
    params(AuditLogQuery, PageParamsQuery),
    responses(
        (status = 200, description = "Audit entries; items are AuditLogDto", body = crate::inbound::http::dto::PageSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["analytics"],
    operation_id = "auditLogs"
)]
#[get("/analytics/logs")]
pub async fn audit_logs(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    query: web::Query<AuditLogQuery>,
    page: web::Query<PageParamsQuery>,
) -> ApiResult<HttpResponse> {
    let action = optional_text(query.action.as_deref());
    let page = parse_page(page.into_inner().into())?;
    let logs = state.analytics.logs(action, page).await?;
    Ok(HttpResponse::Ok().json(logs.map(AuditLogDto::from)))
}

/// Dashboard for the signed-in user.
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardDto),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["analytics"],
    operation_id = "studentDashboard"
)]
#[get("/dashboard")]
pub async fn dashboard(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<DashboardDto>> {
    let board = state.analytics.dashboard(&user).await?;
    Ok(web::Json(board.into()))
}

#[cfg(test)]
mod tests {
    use crate::domain::UserRole;
    use crate::test_support::{TEST_PASSWORD, TestHarness};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn overview_counts_accounts_and_logs_filter_by_action() {
        let harness = TestHarness::new();
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        harness.seed_user(UserRole::Student, "s@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/users/login")
            .set_json(json!({ "email": "s@example.in", "password": TEST_PASSWORD }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/analytics/overview")
            .insert_header(harness.bearer(&admin))
            .to_request();
        let stats: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["totalUsers"], 2);
        assert_eq!(stats["students"], 1);
        assert_eq!(stats["revenue"], 0);

        let req = test::TestRequest::get()
            .uri("/api/analytics/logs?action=user_logged_in")
            .insert_header(harness.bearer(&admin))
            .to_request();
        let logs: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(logs["total"], 1);
        assert_eq!(logs["items"][0]["action"], "user_logged_in");
    }

    #[actix_web::test]
    async fn dashboard_needs_sign_in_and_starts_empty() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::get().uri("/api/dashboard").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::get()
            .uri("/api/dashboard")
            .insert_header(harness.bearer(&student))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["materialCount"], 0);
        assert_eq!(body["subscription"], Value::Null);

        let req = test::TestRequest::get()
            .uri("/api/analytics/overview")
            .insert_header(harness.bearer(&student))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );
    }
}
