//! Maintenance switch.
//!
//! ```text
//! GET /api/maintenance/status   public, reachable while maintenance is on
//! PUT /api/maintenance          admin {"enabled","message"}
//! ```

use actix_web::{get, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::MaintenanceStatus;
use crate::domain::user::optional_text;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AdminUser;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Current switch state.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceDto {
    pub enabled: bool,
    pub message: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<MaintenanceStatus> for MaintenanceDto {
    fn from(status: MaintenanceStatus) -> Self {
        Self {
            enabled: status.enabled,
            message: status.message,
            updated_at: status.updated_at,
        }
    }
}

/// Body for `PUT /api/maintenance`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct MaintenanceRequest {
    pub enabled: bool,
    /// Replaces the banner text when present.
    pub message: Option<String>,
}

/// Whether maintenance is on.
#[utoipa::path(
    get,
    path = "/api/maintenance/status",
    responses((status = 200, description = "Maintenance state", body = MaintenanceDto)),
    tags = ["maintenance"],
    operation_id = "maintenanceStatus",
    security([])
)]
#[get("/maintenance/status")]
pub async fn maintenance_status(state: web::Data<HttpState>) -> web::Json<MaintenanceDto> {
    web::Json(state.maintenance.status().into())
}

/// Turn maintenance on or off.
#[utoipa::path(
    put,
    path = "/api/maintenance",
    request_body = MaintenanceRequest,
    responses(
        (status = 200, description = "Updated state", body = MaintenanceDto),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["maintenance"],
    operation_id = "setMaintenance"
)]
#[put("/maintenance")]
pub async fn set_maintenance(
    state: web::Data<HttpState>,
    admin: AdminUser,
    payload: web::Json<MaintenanceRequest>,
) -> ApiResult<web::Json<MaintenanceDto>> {
    let MaintenanceRequest { enabled, message } = payload.into_inner();
    let status = state
        .maintenance
        .set(&admin, enabled, optional_text(message.as_deref()))
        .await;
    Ok(web::Json(status.into()))
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
    async fn admin_toggles_switch_shared_with_gate() {
        let harness = TestHarness::new();
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::put()
            .uri("/api/maintenance")
            .insert_header(harness.bearer(&admin))
            .set_json(MaintenanceRequest {
                enabled: true,
                message: Some("Back at 6pm".into()),
            })
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["enabled"], true);
        assert!(harness.maintenance.is_enabled());

        let req = test::TestRequest::get()
            .uri("/api/maintenance/status")
            .to_request();
        let status: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(status["message"], "Back at 6pm");
        assert!(status["updatedAt"].is_string());
    }

    #[actix_web::test]
    async fn students_cannot_toggle() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let app = test::init_service(harness.app()).await;
        let req = test::TestRequest::put()
            .uri("/api/maintenance")
            .insert_header(harness.bearer(&student))
            .set_json(MaintenanceRequest {
                enabled: true,
                message: None,
            })
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );
        assert!(!harness.maintenance.is_enabled());
    }
}
