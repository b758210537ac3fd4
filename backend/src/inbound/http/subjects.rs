//! Subject catalogue endpoints.
//!
//! ```text
//! GET    /api/subjects?branch=&semester=
//! GET    /api/subjects/{code}?branch=
//! POST   /api/subjects                admin
//! PUT    /api/subjects/{id}           admin
//! DELETE /api/subjects/{id}           admin, soft-disable
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::user::optional_text;
use crate::domain::{Branch, Error, Semester, Subject, SubjectCode, SubjectDraft, SubjectFilter};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AdminUser;
use crate::inbound::http::dto::MessageResponse;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_field, parse_branch, parse_id, parse_semester,
};

/// Subject as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDto {
    pub id: String,
    #[schema(example = "CO3I")]
    pub code: String,
    #[schema(example = "Data Structures Using C")]
    pub name: String,
    pub branch: String,
    pub semester: u8,
    pub credits: u8,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Subject> for SubjectDto {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id.to_string(),
            code: subject.code.into(),
            name: subject.name,
            branch: subject.branch.to_string(),
            semester: subject.semester.get(),
            credits: subject.credits,
            description: subject.description,
            is_active: subject.is_active,
            created_at: subject.created_at,
            updated_at: subject.updated_at,
        }
    }
}

/// Body for creating or replacing a subject.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SubjectRequest {
    #[schema(example = "CO3I")]
    pub code: String,
    pub name: String,
    #[schema(example = "Computer Engineering")]
    pub branch: String,
    #[schema(example = 3)]
    pub semester: u8,
    #[serde(default)]
    pub credits: u8,
    pub description: Option<String>,
}

impl SubjectRequest {
    fn into_draft(self) -> Result<SubjectDraft, Error> {
        let code =
            SubjectCode::new(&self.code).map_err(|err| invalid_field(FieldName::new("code"), err))?;
        let branch =
            Branch::new(&self.branch).map_err(|err| invalid_field(FieldName::new("branch"), err))?;
        let semester = Semester::new(self.semester)
            .map_err(|err| invalid_field(FieldName::new("semester"), err))?;
        let draft = SubjectDraft {
            code,
            name: self.name,
            branch,
            semester,
            credits: self.credits,
            description: optional_text(self.description.as_deref()),
        };
        draft.validate().map_err(|err| {
            let field = match err {
                crate::domain::SubjectValidationError::InvalidCode => "code",
                crate::domain::SubjectValidationError::EmptyName => "name",
                crate::domain::SubjectValidationError::InvalidCredits => "credits",
            };
            invalid_field(FieldName::new(field), err)
        })?;
        Ok(draft)
    }
}

/// Filters for `GET /api/subjects`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubjectListQuery {
    pub branch: Option<String>,
    pub semester: Option<u8>,
}

/// `?branch=` for code lookups, as codes repeat across branches.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubjectLookupQuery {
    pub branch: Option<String>,
}

/// Active subjects for a branch and semester.
#[utoipa::path(
    get,
    path = "/api/subjects",
    params(SubjectListQuery),
    responses(
        (status = 200, description = "Subjects", body = [SubjectDto]),
        (status = 400, description = "Invalid filter", body = ErrorSchema)
    ),
    tags = ["subjects"],
    operation_id = "listSubjects",
    security([])
)]
#[get("/subjects")]
pub async fn list_subjects(
    state: web::Data<HttpState>,
    query: web::Query<SubjectListQuery>,
) -> ApiResult<web::Json<Vec<SubjectDto>>> {
    let query = query.into_inner();
    let filter = SubjectFilter {
        branch: parse_branch(query.branch.as_deref(), FieldName::new("branch"))?,
        semester: parse_semester(query.semester, FieldName::new("semester"))?,
    };
    let subjects = state.subjects.list(&filter).await?;
    Ok(web::Json(subjects.into_iter().map(SubjectDto::from).collect()))
}

/// Subject by code.
#[utoipa::path(
    get,
    path = "/api/subjects/{code}",
    params(("code" = String, Path, description = "Subject code"), SubjectLookupQuery),
    responses(
        (status = 200, description = "Subject", body = SubjectDto),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["subjects"],
    operation_id = "getSubject",
    security([])
)]
#[get("/subjects/{code}")]
pub async fn get_subject(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<SubjectLookupQuery>,
) -> ApiResult<web::Json<SubjectDto>> {
    let code = SubjectCode::new(path.as_str())
        .map_err(|err| invalid_field(FieldName::new("code"), err))?;
    let branch = parse_branch(query.branch.as_deref(), FieldName::new("branch"))?;
    let subject = state.subjects.find_by_code(&code, branch).await?;
    Ok(web::Json(subject.into()))
}

/// Create a subject.
#[utoipa::path(
    post,
    path = "/api/subjects",
    request_body = SubjectRequest,
    responses(
        (status = 201, description = "Created", body = SubjectDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Code already used in this branch", body = ErrorSchema)
    ),
    tags = ["subjects"],
    operation_id = "createSubject"
)]
#[post("/subjects")]
pub async fn create_subject(
    state: web::Data<HttpState>,
    admin: AdminUser,
    payload: web::Json<SubjectRequest>,
) -> ApiResult<HttpResponse> {
    let draft = payload.into_inner().into_draft()?;
    let subject = state.subjects.create(&admin, draft).await?;
    Ok(HttpResponse::Created().json(SubjectDto::from(subject)))
}

/// Replace a subject.
#[utoipa::path(
    put,
    path = "/api/subjects/{id}",
    params(("id" = String, Path, description = "Subject id")),
    request_body = SubjectRequest,
    responses(
        (status = 200, description = "Updated", body = SubjectDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["subjects"],
    operation_id = "updateSubject"
)]
#[put("/subjects/{id}")]
pub async fn update_subject(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
    payload: web::Json<SubjectRequest>,
) -> ApiResult<web::Json<SubjectDto>> {
    let id = parse_id(&path, FieldName::new("id"))?;
    let draft = payload.into_inner().into_draft()?;
    let subject = state.subjects.update(&admin, &id, draft).await?;
    Ok(web::Json(subject.into()))
}

/// Hide a subject from listings.
#[utoipa::path(
    delete,
    path = "/api/subjects/{id}",
    params(("id" = String, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Disabled", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["subjects"],
    operation_id = "disableSubject"
)]
#[delete("/subjects/{id}")]
pub async fn disable_subject(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id = parse_id(&path, FieldName::new("id"))?;
    state.subjects.disable(&admin, &id).await?;
    Ok(web::Json(MessageResponse::new("Subject disabled")))
}
