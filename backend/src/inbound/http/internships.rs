//! Internship application endpoints.
//!
//! ```text
//! POST  /api/internships               multipart with optional `resume`
//! GET   /api/internships/mine
//! GET   /api/internships?status=       admin
//! PATCH /api/internships/{id}/status   admin {"status","notes"}
//! ```

use actix_multipart::Multipart;
use actix_web::{HttpResponse, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::user::optional_text;
use crate::domain::{
    InternshipApplication, InternshipApplicationId, InternshipDraft, InternshipStatus,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AdminUser, AuthenticatedUser};
use crate::inbound::http::dto::{PageParamsQuery, StoredFileDto, file_dto};
use crate::inbound::http::multipart::MultipartForm;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, missing_field_error, parse_branch, parse_email, parse_id, parse_keyword,
    parse_optional_keyword, parse_page, parse_semester_text,
};

const STATUSES: &str = "pending, shortlisted, accepted, rejected";

/// Application as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InternshipDto {
    pub id: String,
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub branch: String,
    pub semester: u8,
    pub preferred_domain: String,
    pub resume: Option<StoredFileDto>,
    pub cover_letter: Option<String>,
    #[schema(example = "shortlisted")]
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InternshipApplication> for InternshipDto {
    fn from(application: InternshipApplication) -> Self {
        Self {
            id: application.id.to_string(),
            student_id: application.student_id.to_string(),
            name: application.name,
            email: application.email.to_string(),
            phone: application.phone,
            branch: application.branch.to_string(),
            semester: application.semester.get(),
            preferred_domain: application.preferred_domain,
            resume: file_dto(application.resume.as_ref()),
            cover_letter: application.cover_letter,
            status: application.status.as_str().to_owned(),
            admin_notes: application.admin_notes,
            created_at: application.created_at,
            updated_at: application.updated_at,
        }
    }
}

/// Body for `PATCH /api/internships/{id}/status`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct StatusRequest {
    #[schema(example = "shortlisted")]
    pub status: String,
    /// Replaces the admin notes when present.
    pub notes: Option<String>,
}

/// `?status=` filter for admin listings.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InternshipListQuery {
    pub status: Option<String>,
}

/// Apply for an internship.
///
/// Name, email, branch and semester default to the caller's profile.
#[utoipa::path(
    post,
    path = "/api/internships",
    request_body(content_type = "multipart/form-data", description = "Application fields and an optional `resume`"),
    responses(
        (status = 201, description = "Application received", body = InternshipDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["internships"],
    operation_id = "applyInternship"
)]
#[post("/internships")]
pub async fn apply_internship(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = MultipartForm::read(payload).await?;
    let resume = form.take_file("resume");
    let email = match optional_text(form.text("email")) {
        Some(raw) => parse_email(&raw, FieldName::new("email"))?,
        None => user.email.clone(),
    };
    let branch = parse_branch(form.text("branch"), FieldName::new("branch"))?
        .or_else(|| user.branch.clone())
        .ok_or_else(|| missing_field_error(FieldName::new("branch")))?;
    let semester = parse_semester_text(form.text("semester"), FieldName::new("semester"))?
        .or(user.semester)
        .ok_or_else(|| missing_field_error(FieldName::new("semester")))?;
    let draft = InternshipDraft {
        name: optional_text(form.text("name")).unwrap_or_else(|| user.name.clone()),
        email,
        phone: optional_text(form.text("phone")),
        branch,
        semester,
        preferred_domain: form
            .owned("preferredDomain")
            .ok_or_else(|| missing_field_error(FieldName::new("preferredDomain")))?,
        cover_letter: optional_text(form.text("coverLetter")),
    };
    let application = state.internships.apply(&user, draft, resume).await?;
    Ok(HttpResponse::Created().json(InternshipDto::from(application)))
}

/// The caller's applications.
#[utoipa::path(
    get,
    path = "/api/internships/mine",
    responses(
        (status = 200, description = "Applications", body = [InternshipDto]),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["internships"],
    operation_id = "myInternships"
)]
#[get("/internships/mine")]
pub async fn my_internships(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<Vec<InternshipDto>>> {
    let applications = state.internships.mine(&user).await?;
    Ok(web::Json(
        applications.into_iter().map(InternshipDto::from).collect(),
    ))
}

/// Every application, optionally by status.
#[utoipa::path(
    get,
    path = "/api/internships",
    params(InternshipListQuery, PageParamsQuery),
    responses(
        (status = 200, description = "Applications; items are InternshipDto", body = crate::inbound::http::dto::PageSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["internships"],
    operation_id = "listInternships"
)]
#[get("/internships")]
pub async fn list_internships(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    query: web::Query<InternshipListQuery>,
    page: web::Query<PageParamsQuery>,
) -> ApiResult<HttpResponse> {
    let status: Option<InternshipStatus> =
        parse_optional_keyword(query.status.as_deref(), FieldName::new("status"), STATUSES)?;
    let page = parse_page(page.into_inner().into())?;
    let applications = state.internships.list(status, page).await?;
    Ok(HttpResponse::Ok().json(applications.map(InternshipDto::from)))
}

/// Move an application to a new status.
#[utoipa::path(
    patch,
    path = "/api/internships/{id}/status",
    params(("id" = String, Path, description = "Application id")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Updated", body = InternshipDto),
        (status = 400, description = "Invalid status", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["internships"],
    operation_id = "setInternshipStatus"
)]
#[patch("/internships/{id}/status")]
pub async fn set_internship_status(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
    payload: web::Json<StatusRequest>,
) -> ApiResult<web::Json<InternshipDto>> {
    let id: InternshipApplicationId = parse_id(&path, FieldName::new("id"))?;
    let StatusRequest { status, notes } = payload.into_inner();
    let status = parse_keyword(&status, FieldName::new("status"), STATUSES)?;
    let application = state
        .internships
        .set_status(&admin, &id, status, optional_text(notes.as_deref()))
        .await?;
    Ok(web::Json(application.into()))
}
