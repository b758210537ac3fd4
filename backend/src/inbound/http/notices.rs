//! Notice board and announcement endpoints.
//!
//! ```text
//! GET    /api/notices                  visible to the caller, pinned first
//! GET    /api/notices/{id}
//! POST   /api/notices                  admin, multipart (optional `attachment`)
//! PUT    /api/notices/{id}             admin, multipart
//! DELETE /api/notices/{id}             admin
//! GET    /api/announcements
//! POST   /api/announcements            admin
//! DELETE /api/announcements/{id}       admin
//! ```

use actix_multipart::Multipart;
use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Announcement, AnnouncementDraft, AnnouncementId, Audience, Error, Notice, NoticeDraft,
    NoticeId, NoticePriority, NoticeValidationError,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AdminUser, OptionalUser};
use crate::inbound::http::dto::{MessageResponse, StoredFileDto, file_dto};
use crate::inbound::http::multipart::MultipartForm;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_field, missing_field_error, parse_branch, parse_flag, parse_id,
    parse_optional_keyword, parse_optional_rfc3339_timestamp, parse_semester_text,
};

const AUDIENCES: &str = "all, students, admins";
const PRIORITIES: &str = "low, normal, high, urgent";
const DEFAULT_CATEGORY: &str = "general";

/// Notice as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoticeDto {
    pub id: String,
    pub title: String,
    pub content: String,
    #[schema(example = "exam")]
    pub category: String,
    #[schema(example = "high")]
    pub priority: String,
    #[schema(example = "students")]
    pub audience: String,
    pub branch: Option<String>,
    pub semester: Option<u8>,
    pub attachment: Option<StoredFileDto>,
    pub pinned: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Notice> for NoticeDto {
    fn from(notice: Notice) -> Self {
        Self {
            id: notice.id.to_string(),
            title: notice.title,
            content: notice.content,
            category: notice.category,
            priority: notice.priority.as_str().to_owned(),
            audience: notice.audience.as_str().to_owned(),
            branch: notice.branch.map(|b| b.to_string()),
            semester: notice.semester.map(|s| s.get()),
            attachment: file_dto(notice.attachment.as_ref()),
            pinned: notice.pinned,
            expires_at: notice.expires_at,
            is_active: notice.is_active,
            author: notice.author.to_string(),
            created_at: notice.created_at,
            updated_at: notice.updated_at,
        }
    }
}

/// Announcement as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementDto {
    pub id: String,
    pub title: String,
    pub message: String,
    pub audience: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl From<Announcement> for AnnouncementDto {
    fn from(announcement: Announcement) -> Self {
        Self {
            id: announcement.id.to_string(),
            title: announcement.title,
            message: announcement.message,
            audience: announcement.audience.as_str().to_owned(),
            expires_at: announcement.expires_at,
            author: announcement.author.to_string(),
            created_at: announcement.created_at,
        }
    }
}

/// Body for `POST /api/announcements`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementRequest {
    pub title: String,
    pub message: String,
    /// `all` (default), `students`, or `admins`.
    pub audience: Option<String>,
    /// RFC 3339 timestamp.
    pub expires_at: Option<String>,
}

fn notice_error(err: NoticeValidationError) -> Error {
    let field = match err {
        NoticeValidationError::EmptyTitle => "title",
        NoticeValidationError::EmptyContent => "content",
        NoticeValidationError::ExpiryInPast => "expiresAt",
    };
    invalid_field(FieldName::new(field), err)
}

fn draft_from_form(form: &MultipartForm) -> Result<NoticeDraft, Error> {
    let title = form
        .owned("title")
        .ok_or_else(|| missing_field_error(FieldName::new("title")))?;
    let content = form
        .owned("content")
        .ok_or_else(|| missing_field_error(FieldName::new("content")))?;
    let priority: Option<NoticePriority> =
        parse_optional_keyword(form.text("priority"), FieldName::new("priority"), PRIORITIES)?;
    let audience: Option<Audience> = parse_optional_keyword(
        form.text_any(&["audience", "targetAudience"]),
        FieldName::new("audience"),
        AUDIENCES,
    )?;
    Ok(NoticeDraft {
        title,
        content,
        category: form
            .owned("category")
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
        priority: priority.unwrap_or_default(),
        audience: audience.unwrap_or_default(),
        branch: parse_branch(form.text("branch"), FieldName::new("branch"))?,
        semester: parse_semester_text(form.text("semester"), FieldName::new("semester"))?,
        pinned: parse_flag(form.text_any(&["pinned", "isPinned"])),
        expires_at: parse_optional_rfc3339_timestamp(
            form.text("expiresAt"),
            FieldName::new("expiresAt"),
        )?,
    })
}

fn validated_draft(state: &HttpState, form: &MultipartForm) -> Result<NoticeDraft, Error> {
    let draft = draft_from_form(form)?;
    draft.validate(state.now()).map_err(notice_error)?;
    Ok(draft)
}

/// Notices visible to the caller.
#[utoipa::path(
    get,
    path = "/api/notices",
    responses((status = 200, description = "Notices, pinned first then newest", body = [NoticeDto])),
    tags = ["notices"],
    operation_id = "listNotices",
    security((), ("bearerAuth" = []))
)]
#[get("/notices")]
pub async fn list_notices(
    state: web::Data<HttpState>,
    viewer: OptionalUser,
) -> ApiResult<web::Json<Vec<NoticeDto>>> {
    let notices = state.notices.board(viewer.as_ref()).await?;
    Ok(web::Json(notices.into_iter().map(NoticeDto::from).collect()))
}

/// One notice, if visible to the caller.
#[utoipa::path(
    get,
    path = "/api/notices/{id}",
    params(("id" = String, Path, description = "Notice id")),
    responses(
        (status = 200, description = "Notice", body = NoticeDto),
        (status = 404, description = "Not found or not visible", body = ErrorSchema)
    ),
    tags = ["notices"],
    operation_id = "getNotice",
    security((), ("bearerAuth" = []))
)]
#[get("/notices/{id}")]
pub async fn get_notice(
    state: web::Data<HttpState>,
    viewer: OptionalUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<NoticeDto>> {
    let id: NoticeId = parse_id(&path, FieldName::new("id"))?;
    let notice = state.notices.get(viewer.as_ref(), &id).await?;
    Ok(web::Json(notice.into()))
}

/// Publish a notice and notify its audience.
#[utoipa::path(
    post,
    path = "/api/notices",
    request_body(content_type = "multipart/form-data", description = "Notice fields and an optional `attachment`"),
    responses(
        (status = 201, description = "Created", body = NoticeDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["notices"],
    operation_id = "createNotice"
)]
#[post("/notices")]
pub async fn create_notice(
    state: web::Data<HttpState>,
    admin: AdminUser,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = MultipartForm::read(payload).await?;
    let attachment = form.take_file("attachment");
    let draft = validated_draft(&state, &form)?;
    let notice = state.notices.create(&admin, draft, attachment).await?;
    Ok(HttpResponse::Created().json(NoticeDto::from(notice)))
}

/// Replace a notice.
#[utoipa::path(
    put,
    path = "/api/notices/{id}",
    params(("id" = String, Path, description = "Notice id")),
    request_body(content_type = "multipart/form-data", description = "Notice fields and an optional `attachment`"),
    responses(
        (status = 200, description = "Updated", body = NoticeDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["notices"],
    operation_id = "updateNotice"
)]
#[put("/notices/{id}")]
pub async fn update_notice(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
    payload: Multipart,
) -> ApiResult<web::Json<NoticeDto>> {
    let id: NoticeId = parse_id(&path, FieldName::new("id"))?;
    let mut form = MultipartForm::read(payload).await?;
    let attachment = form.take_file("attachment");
    let draft = validated_draft(&state, &form)?;
    let notice = state.notices.update(&admin, &id, draft, attachment).await?;
    Ok(web::Json(notice.into()))
}

/// Delete a notice and its attachment.
#[utoipa::path(
    delete,
    path = "/api/notices/{id}",
    params(("id" = String, Path, description = "Notice id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["notices"],
    operation_id = "deleteNotice"
)]
#[delete("/notices/{id}")]
pub async fn delete_notice(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id: NoticeId = parse_id(&path, FieldName::new("id"))?;
    state.notices.delete(&admin, &id).await?;
    Ok(web::Json(MessageResponse::new("Notice deleted")))
}

/// Active announcements for the caller's audience.
#[utoipa::path(
    get,
    path = "/api/announcements",
    responses((status = 200, description = "Announcements, newest first", body = [AnnouncementDto])),
    tags = ["notices"],
    operation_id = "listAnnouncements",
    security((), ("bearerAuth" = []))
)]
#[get("/announcements")]
pub async fn list_announcements(
    state: web::Data<HttpState>,
    viewer: OptionalUser,
) -> ApiResult<web::Json<Vec<AnnouncementDto>>> {
    let announcements = state.notices.announcements(viewer.as_ref()).await?;
    Ok(web::Json(
        announcements.into_iter().map(AnnouncementDto::from).collect(),
    ))
}

/// Post an announcement.
#[utoipa::path(
    post,
    path = "/api/announcements",
    request_body = AnnouncementRequest,
    responses(
        (status = 201, description = "Created", body = AnnouncementDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["notices"],
    operation_id = "createAnnouncement"
)]
#[post("/announcements")]
pub async fn create_announcement(
    state: web::Data<HttpState>,
    admin: AdminUser,
    payload: web::Json<AnnouncementRequest>,
) -> ApiResult<HttpResponse> {
    let AnnouncementRequest {
        title,
        message,
        audience,
        expires_at,
    } = payload.into_inner();
    let audience: Option<Audience> =
        parse_optional_keyword(audience.as_deref(), FieldName::new("audience"), AUDIENCES)?;
    let draft = AnnouncementDraft {
        title,
        message,
        audience: audience.unwrap_or_default(),
        expires_at: parse_optional_rfc3339_timestamp(
            expires_at.as_deref(),
            FieldName::new("expiresAt"),
        )?,
    };
    let announcement = state.notices.announce(&admin, draft).await?;
    Ok(HttpResponse::Created().json(AnnouncementDto::from(announcement)))
}

/// Remove an announcement.
#[utoipa::path(
    delete,
    path = "/api/announcements/{id}",
    params(("id" = String, Path, description = "Announcement id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["notices"],
    operation_id = "deleteAnnouncement"
)]
#[delete("/announcements/{id}")]
pub async fn delete_announcement(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id: AnnouncementId = parse_id(&path, FieldName::new("id"))?;
    state.notices.remove_announcement(&id).await?;
    Ok(web::Json(MessageResponse::new("Announcement deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use crate::test_support::{MultipartBody, MultipartFile, TestHarness};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;

    fn notice_form(title: &str) -> MultipartBody {
        MultipartBody::new()
            .text("title", title)
            .text("content", "Submit your forms by Friday.")
            .text("priority", "high")
    }

    #[actix_web::test]
    async fn board_honours_audience_and_pins() {
        let harness = TestHarness::new();
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let app = test::init_service(harness.app()).await;

        for body in [
            notice_form("Public notice"),
            notice_form("Students only").text("audience", "students"),
            notice_form("Pinned").text("pinned", "true"),
            notice_form("Mechanical only").text("branch", "Mechanical Engineering"),
        ] {
            let req = body
                .attach(
                    test::TestRequest::post()
                        .uri("/api/notices")
                        .insert_header(harness.bearer(&admin)),
                )
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/api/notices").to_request();
        let anonymous: Value = test::call_and_read_body_json(&app, req).await;
        let titles: Vec<&str> = anonymous
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|n| n["title"].as_str())
            .collect();
        assert_eq!(titles.first(), Some(&"Pinned"));
        assert!(titles.contains(&"Public notice"));
        assert!(!titles.contains(&"Students only"));
        assert!(!titles.contains(&"Mechanical only"));

        let req = test::TestRequest::get()
            .uri("/api/notices")
            .insert_header(harness.bearer(&student))
            .to_request();
        let signed_in: Value = test::call_and_read_body_json(&app, req).await;
        let titles: Vec<&str> = signed_in
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|n| n["title"].as_str())
            .collect();
        assert!(titles.contains(&"Students only"));
        assert!(!titles.contains(&"Mechanical only"));
    }

    #[actix_web::test]
    async fn notice_with_attachment_and_past_expiry() {
        let harness = TestHarness::new();
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = notice_form("Timetable")
            .file(MultipartFile::new(
                "attachment",
                "timetable.pdf",
                "application/pdf",
                b"%PDF",
            ))
            .attach(
                test::TestRequest::post()
                    .uri("/api/notices")
                    .insert_header(harness.bearer(&admin)),
            )
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(res).await;
        assert_eq!(created["attachment"]["originalName"], "timetable.pdf");
        assert_eq!(created["priority"], "high");

        let req = notice_form("Stale")
            .text("expiresAt", "2000-01-01T00:00:00Z")
            .attach(
                test::TestRequest::post()
                    .uri("/api/notices")
                    .insert_header(harness.bearer(&admin)),
            )
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["details"]["field"], "expiresAt");
    }

    #[actix_web::test]
    async fn announcements_round_trip() {
        let harness = TestHarness::new();
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/announcements")
            .insert_header(harness.bearer(&admin))
            .set_json(AnnouncementRequest {
                title: "Results out".into(),
                message: "Winter results are published.".into(),
                audience: None,
                expires_at: None,
            })
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(res).await;
        let id = created["id"].as_str().expect("id").to_owned();

        let req = test::TestRequest::get().uri("/api/announcements").to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let req = test::TestRequest::delete()
            .uri(&format!("/api/announcements/{id}"))
            .insert_header(harness.bearer(&admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/announcements/{id}"))
            .insert_header(harness.bearer(&admin))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
