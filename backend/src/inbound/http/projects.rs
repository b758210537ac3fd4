//! Student project showcase endpoints.
//!
//! ```text
//! POST   /api/projects                 multipart: title, description, techStack,
//!                                      repositoryUrl, demoUrl, file
//! GET    /api/projects/mine
//! GET    /api/projects?status=         admin
//! PATCH  /api/projects/{id}/review     admin {"status","feedback"}
//! DELETE /api/projects/{id}            owner while pending, or admin
//! ```

use actix_multipart::Multipart;
use actix_web::{HttpResponse, delete, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::user::optional_text;
use crate::domain::{ProjectDraft, ProjectId, ProjectReview, ProjectStatus, ProjectSubmission, split_list};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AdminUser, AuthenticatedUser};
use crate::inbound::http::dto::{MessageResponse, PageParamsQuery, StoredFileDto, file_dto};
use crate::inbound::http::multipart::MultipartForm;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, missing_field_error, parse_id, parse_keyword, parse_optional_keyword, parse_page,
};

const STATUSES: &str = "pending, approved, rejected";

/// Project submission as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub title: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub branch: Option<String>,
    pub semester: Option<u8>,
    pub repository_url: Option<String>,
    pub demo_url: Option<String>,
    pub file: Option<StoredFileDto>,
    #[schema(example = "pending")]
    pub status: String,
    pub feedback: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectSubmission> for ProjectDto {
    fn from(project: ProjectSubmission) -> Self {
        Self {
            id: project.id.to_string(),
            student_id: project.student_id.to_string(),
            student_name: project.student_name,
            title: project.title,
            description: project.description,
            tech_stack: project.tech_stack,
            branch: project.branch.map(|b| b.to_string()),
            semester: project.semester.map(|s| s.get()),
            repository_url: project.repository_url,
            demo_url: project.demo_url,
            file: file_dto(project.file.as_ref()),
            status: project.status.as_str().to_owned(),
            feedback: project.feedback,
            reviewed_by: project.reviewed_by.map(|id| id.to_string()),
            reviewed_at: project.reviewed_at,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// Body for `PATCH /api/projects/{id}/review`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ReviewRequest {
    #[schema(example = "approved")]
    pub status: String,
    pub feedback: Option<String>,
}

/// `?status=` filter for admin listings.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectListQuery {
    pub status: Option<String>,
}

fn project_id(raw: &str) -> Result<ProjectId, crate::domain::Error> {
    parse_id(raw, FieldName::new("id"))
}

/// Submit a project for review.
#[utoipa::path(
    post,
    path = "/api/projects",
    request_body(content_type = "multipart/form-data", description = "Project fields and an optional `file`"),
    responses(
        (status = 201, description = "Submitted", body = ProjectDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["projects"],
    operation_id = "submitProject"
)]
#[post("/projects")]
pub async fn submit_project(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = MultipartForm::read(payload).await?;
    let upload = form.take_file("file");
    let draft = ProjectDraft {
        title: form
            .owned("title")
            .ok_or_else(|| missing_field_error(FieldName::new("title")))?,
        description: form
            .owned("description")
            .ok_or_else(|| missing_field_error(FieldName::new("description")))?,
        tech_stack: form
            .text_any(&["techStack", "technologies"])
            .map(split_list)
            .unwrap_or_default(),
        repository_url: optional_text(form.text_any(&["repositoryUrl", "githubLink"])),
        demo_url: optional_text(form.text_any(&["demoUrl", "liveLink"])),
    };
    let project = state.projects.submit(&user, draft, upload).await?;
    Ok(HttpResponse::Created().json(ProjectDto::from(project)))
}

/// The caller's submissions.
#[utoipa::path(
    get,
    path = "/api/projects/mine",
    responses(
        (status = 200, description = "Submissions", body = [ProjectDto]),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["projects"],
    operation_id = "myProjects"
)]
#[get("/projects/mine")]
pub async fn my_projects(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<Vec<ProjectDto>>> {
    let projects = state.projects.mine(&user).await?;
    Ok(web::Json(projects.into_iter().map(ProjectDto::from).collect()))
}

/// All submissions, optionally by status.
#[utoipa::path(
    get,
    path = "/api/projects",
    params(ProjectListQuery, PageParamsQuery),
    responses(
        (status = 200, description = "Submissions; items are ProjectDto", body = crate::inbound::http::dto::PageSchema),
        (status = 400, description = "Invalid status", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["projects"],
    operation_id = "listProjects"
)]
#[get("/projects")]
pub async fn list_projects(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    query: web::Query<ProjectListQuery>,
    page: web::Query<PageParamsQuery>,
) -> ApiResult<HttpResponse> {
    let status: Option<ProjectStatus> =
        parse_optional_keyword(query.status.as_deref(), FieldName::new("status"), STATUSES)?;
    let page = parse_page(page.into_inner().into())?;
    let projects = state.projects.list(status, page).await?;
    Ok(HttpResponse::Ok().json(projects.map(ProjectDto::from)))
}

/// Approve or reject a submission.
#[utoipa::path(
    patch,
    path = "/api/projects/{id}/review",
    params(("id" = String, Path, description = "Project id")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Reviewed", body = ProjectDto),
        (status = 400, description = "Invalid status", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["projects"],
    operation_id = "reviewProject"
)]
#[patch("/projects/{id}/review")]
pub async fn review_project(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
    payload: web::Json<ReviewRequest>,
) -> ApiResult<web::Json<ProjectDto>> {
    let id = project_id(&path)?;
    let ReviewRequest { status, feedback } = payload.into_inner();
    let review = ProjectReview {
        status: parse_keyword(&status, FieldName::new("status"), STATUSES)?,
        feedback: optional_text(feedback.as_deref()),
    };
    let project = state.projects.review(&admin, &id, review).await?;
    Ok(web::Json(project.into()))
}

/// Withdraw or remove a submission.
#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Already reviewed", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["projects"],
    operation_id = "deleteProject"
)]
#[delete("/projects/{id}")]
pub async fn delete_project(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id = project_id(&path)?;
    state.projects.delete(&user, &id).await?;
    Ok(web::Json(MessageResponse::new("Project deleted")))
}
