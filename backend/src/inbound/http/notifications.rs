//! In-app notification inbox.
//!
//! ```text
//! GET   /api/notifications
//! GET   /api/notifications/unread-count
//! PATCH /api/notifications/{id}/read
//! POST  /api/notifications/read-all
//! POST  /api/notifications            admin broadcast or direct message
//! ```

use actix_web::{HttpResponse, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::user::optional_text;
use crate::domain::{
    Audience, InboxItem, Notification, NotificationDraft, NotificationId, NotificationKind, UserId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AdminUser, AuthenticatedUser};
use crate::inbound::http::dto::MessageResponse;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_id, parse_optional_keyword, require_text,
};

/// Notification as shown in the inbox.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub id: String,
    pub title: String,
    pub message: String,
    #[schema(example = "material")]
    pub kind: String,
    #[schema(example = "students")]
    pub audience: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationDto {
    fn new(notification: Notification, read: bool) -> Self {
        Self {
            id: notification.id.to_string(),
            title: notification.title,
            message: notification.message,
            kind: notification.kind.as_str().to_owned(),
            audience: notification.audience.as_str().to_owned(),
            link: notification.link,
            read,
            created_at: notification.created_at,
        }
    }
}

impl From<InboxItem> for NotificationDto {
    fn from(item: InboxItem) -> Self {
        Self::new(item.notification, item.read)
    }
}

/// Unread badge count.
#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCount {
    pub count: u64,
}

/// Body for `POST /api/notifications`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    #[schema(example = "info")]
    pub kind: Option<String>,
    /// Ignored when `recipientId` is set.
    #[schema(example = "all")]
    pub audience: Option<String>,
    pub recipient_id: Option<String>,
    pub link: Option<String>,
}

/// The caller's newest notifications.
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Inbox", body = [NotificationDto]),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "listNotifications"
)]
#[get("/notifications")]
pub async fn list_notifications(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<Vec<NotificationDto>>> {
    let inbox = state.notifications.inbox(&user).await?;
    Ok(web::Json(inbox.into_iter().map(NotificationDto::from).collect()))
}

/// Number of unread notifications.
#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses(
        (status = 200, description = "Unread count", body = UnreadCount),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "unreadNotificationCount"
)]
#[get("/notifications/unread-count")]
pub async fn unread_count(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<UnreadCount>> {
    let count = state.notifications.unread_count(&user).await?;
    Ok(web::Json(UnreadCount { count }))
}

/// Mark one notification read.
#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked read", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "markNotificationRead"
)]
#[patch("/notifications/{id}/read")]
pub async fn mark_read(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id: NotificationId = parse_id(&path, FieldName::new("id"))?;
    state.notifications.mark_read(&user, &id).await?;
    Ok(web::Json(MessageResponse::new("Notification marked as read")))
}

/// Mark everything read.
#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, description = "Number of notifications marked", body = UnreadCount),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "markAllNotificationsRead"
)]
#[post("/notifications/read-all")]
pub async fn mark_all_read(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<UnreadCount>> {
    let count = state.notifications.mark_all_read(&user).await?;
    Ok(web::Json(UnreadCount { count }))
}

/// Publish a notification to an audience or a single user.
#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = NotificationRequest,
    responses(
        (status = 201, description = "Published", body = NotificationDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "publishNotification"
)]
#[post("/notifications")]
pub async fn publish_notification(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    payload: web::Json<NotificationRequest>,
) -> ApiResult<HttpResponse> {
    let request = payload.into_inner();
    let recipient = optional_text(request.recipient_id.as_deref())
        .map(|raw| parse_id::<UserId>(&raw, FieldName::new("recipientId")))
        .transpose()?;
    let draft = NotificationDraft {
        recipient,
        audience: parse_optional_keyword(
            request.audience.as_deref(),
            FieldName::new("audience"),
            "all, students, admins",
        )?
        .unwrap_or(Audience::All),
        title: require_text(request.title, FieldName::new("title"))?,
        message: require_text(request.message, FieldName::new("message"))?,
        kind: parse_optional_keyword::<NotificationKind>(
            request.kind.as_deref(),
            FieldName::new("kind"),
            "info, notice, material, payment, system",
        )?
        .unwrap_or_default(),
        link: optional_text(request.link.as_deref()),
    };
    let notification = state.notifications.publish(draft).await?;
    Ok(HttpResponse::Created().json(NotificationDto::new(notification, false)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::NotificationFeed;
    use crate::domain::{User, UserRole};
    use crate::test_support::TestHarness;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;

    #[actix_web::test]
    async fn broadcast_reaches_inbox_and_socket_subscribers() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let mut events = harness.hub.subscribe();
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/notifications")
            .insert_header(harness.bearer(&admin))
            .set_json(NotificationRequest {
                title: Some("Exam schedule".into()),
                message: Some("Winter exams start on 12 November".into()),
                audience: Some("students".into()),
                ..NotificationRequest::default()
            })
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let event = events.try_recv().expect("hub event");
        assert_eq!(event.title, "Exam schedule");

        let count = |user: &User| {
            test::TestRequest::get()
                .uri("/api/notifications/unread-count")
                .insert_header(harness.bearer(user))
                .to_request()
        };
        let body: Value = test::call_and_read_body_json(&app, count(&student)).await;
        assert_eq!(body["count"], 1);

        let req = test::TestRequest::get()
            .uri("/api/notifications")
            .insert_header(harness.bearer(&student))
            .to_request();
        let inbox: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(inbox[0]["read"], false);
        let id = inbox[0]["id"].as_str().expect("id").to_owned();

        let req = test::TestRequest::patch()
            .uri(&format!("/api/notifications/{id}/read"))
            .insert_header(harness.bearer(&student))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let body: Value = test::call_and_read_body_json(&app, count(&student)).await;
        assert_eq!(body["count"], 0);
    }

    #[actix_web::test]
    async fn direct_messages_stay_private() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let other = harness.seed_user(UserRole::Student, "o@example.in").await;
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/notifications")
            .insert_header(harness.bearer(&admin))
            .set_json(NotificationRequest {
                title: Some("Fee receipt".into()),
                message: Some("Your receipt is ready".into()),
                recipient_id: Some(student.id.to_string()),
                kind: Some("payment".into()),
                ..NotificationRequest::default()
            })
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_str().expect("id");

        let req = test::TestRequest::patch()
            .uri(&format!("/api/notifications/{id}/read"))
            .insert_header(harness.bearer(&other))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );

        let req = test::TestRequest::post()
            .uri("/api/notifications/read-all")
            .insert_header(harness.bearer(&student))
            .to_request();
        let marked: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(marked["count"], 1);
    }

    #[actix_web::test]
    async fn publishing_requires_admin_and_title() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/notifications")
            .insert_header(harness.bearer(&student))
            .set_json(NotificationRequest::default())
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = test::TestRequest::post()
            .uri("/api/notifications")
            .insert_header(harness.bearer(&admin))
            .set_json(NotificationRequest {
                message: Some("No title".into()),
                ..NotificationRequest::default()
            })
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["details"]["field"], "title");
    }
}
