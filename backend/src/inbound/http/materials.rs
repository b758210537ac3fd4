//! Study material endpoints.
//!
//! ```text
//! GET    /api/materials?subjectCode=&branch=&semester=&type=&accessType=&search=&page=&limit=
//! GET    /api/materials/subject/{code}
//! GET    /api/materials/proxy/{key}     streams an R2 object
//! GET    /api/materials/{id}
//! GET    /api/materials/{id}/download   signed in
//! POST   /api/materials                 admin, multipart
//! PUT    /api/materials/{id}            admin, multipart
//! DELETE /api/materials/{id}            admin
//! ```
//!
//! Multipart forms carry the file under `file` plus text fields `title`,
//! `description`, `subjectCode`, `subjectName`, `branch`, `semester`, `type`,
//! `accessType`, `price` (paise), `driveUrl`, and comma-separated `tags`.

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::user::optional_text;
use crate::domain::{
    AccessType, Branch, Error, Material, MaterialDraft, MaterialFilter, MaterialId, MaterialKind,
    MaterialValidationError, MaterialView, ObjectKey, Semester, SubjectCode, split_list,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AdminUser, AuthenticatedUser, OptionalUser, client_ip};
use crate::inbound::http::dto::{MessageResponse, PageParamsQuery, StoredFileDto, file_dto};
use crate::inbound::http::multipart::MultipartForm;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_field, missing_field_error, parse_amount_text, parse_branch, parse_id,
    parse_optional_keyword, parse_page, parse_semester, parse_semester_text,
};

const KINDS: &str = "notes, pyq, lab_manual, syllabus, book, other";
const ACCESS_TYPES: &str = "free, paid, drive_protected";

/// Material as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDto {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "22317")]
    pub subject_code: String,
    pub subject_name: Option<String>,
    pub branch: String,
    pub semester: u8,
    #[serde(rename = "type")]
    #[schema(example = "pyq")]
    pub kind: String,
    pub file: Option<StoredFileDto>,
    #[schema(example = "paid")]
    pub access_type: String,
    /// Price in paise.
    pub price: u64,
    pub drive_url: Option<String>,
    pub downloads: u64,
    pub views: u64,
    pub tags: Vec<String>,
    pub uploaded_by: String,
    pub is_active: bool,
    /// Present on single-material reads: whether the caller may download.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_access: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Material> for MaterialDto {
    fn from(material: Material) -> Self {
        Self {
            id: material.id.to_string(),
            title: material.title,
            description: material.description,
            subject_code: material.subject_code.into(),
            subject_name: material.subject_name,
            branch: material.branch.to_string(),
            semester: material.semester.get(),
            kind: material.kind.as_str().to_owned(),
            file: file_dto(material.file.as_ref()),
            access_type: material.access_type.as_str().to_owned(),
            price: material.price,
            drive_url: material.drive_url,
            downloads: material.downloads,
            views: material.views,
            tags: material.tags,
            uploaded_by: material.uploaded_by.to_string(),
            is_active: material.is_active,
            has_access: None,
            created_at: material.created_at,
            updated_at: material.updated_at,
        }
    }
}

impl From<MaterialView> for MaterialDto {
    fn from(view: MaterialView) -> Self {
        Self {
            has_access: Some(view.has_access),
            ..view.material.into()
        }
    }
}

/// `{ "url": ... }` answer of the download endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadResponse {
    pub url: String,
}

/// Filters for `GET /api/materials`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct MaterialListQuery {
    pub subject_code: Option<String>,
    pub branch: Option<String>,
    pub semester: Option<u8>,
    /// Material kind, e.g. `pyq`.
    #[serde(rename = "type")]
    #[param(rename = "type")]
    pub kind: Option<String>,
    pub access_type: Option<String>,
    pub search: Option<String>,
}

impl MaterialListQuery {
    fn into_filter(self) -> Result<MaterialFilter, Error> {
        let subject_code = self
            .subject_code
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                SubjectCode::new(raw).map_err(|err| invalid_field(FieldName::new("subjectCode"), err))
            })
            .transpose()?;
        Ok(MaterialFilter {
            subject_code,
            branch: parse_branch(self.branch.as_deref(), FieldName::new("branch"))?,
            semester: parse_semester(self.semester, FieldName::new("semester"))?,
            kind: parse_optional_keyword(self.kind.as_deref(), FieldName::new("type"), KINDS)?,
            access_type: parse_optional_keyword(
                self.access_type.as_deref(),
                FieldName::new("accessType"),
                ACCESS_TYPES,
            )?,
            search: optional_text(self.search.as_deref()),
        })
    }
}

fn material_error(err: MaterialValidationError) -> Error {
    let field = match &err {
        MaterialValidationError::EmptyTitle => "title",
        MaterialValidationError::MissingPrice => "price",
        MaterialValidationError::MissingDriveUrl => "driveUrl",
        MaterialValidationError::MissingFile => "file",
        MaterialValidationError::Unknown { field, .. } => *field,
    };
    invalid_field(FieldName::new(field), err)
}

/// Build a draft from multipart text fields and check its cross-field
/// rules. `has_file` covers both a new upload and a file already stored.
fn draft_from_form(form: &MultipartForm, has_file: bool) -> Result<MaterialDraft, Error> {
    let title = form
        .owned("title")
        .ok_or_else(|| missing_field_error(FieldName::new("title")))?;
    let subject_code = form
        .text_any(&["subjectCode", "subject"])
        .ok_or_else(|| missing_field_error(FieldName::new("subjectCode")))
        .and_then(|raw| {
            SubjectCode::new(raw).map_err(|err| invalid_field(FieldName::new("subjectCode"), err))
        })?;
    let branch = form
        .text("branch")
        .ok_or_else(|| missing_field_error(FieldName::new("branch")))
        .and_then(|raw| Branch::new(raw).map_err(|err| invalid_field(FieldName::new("branch"), err)))?;
    let semester: Semester = parse_semester_text(form.text("semester"), FieldName::new("semester"))?
        .ok_or_else(|| missing_field_error(FieldName::new("semester")))?;
    let kind = match form.text_any(&["type", "kind"]) {
        Some(raw) => raw.parse::<MaterialKind>().map_err(material_error)?,
        None => MaterialKind::Notes,
    };
    let access_type = match form.text("accessType") {
        Some(raw) => raw.parse::<AccessType>().map_err(material_error)?,
        None => AccessType::Free,
    };
    let draft = MaterialDraft {
        title,
        description: form.owned("description"),
        subject_code,
        subject_name: form.owned("subjectName"),
        branch,
        semester,
        kind,
        access_type,
        price: parse_amount_text(form.text("price"), FieldName::new("price"))?,
        drive_url: form.owned("driveUrl"),
        tags: form.text("tags").map(split_list).unwrap_or_default(),
    };
    draft.validate(has_file).map_err(material_error)?;
    Ok(draft)
}

fn material_id(raw: &str) -> Result<MaterialId, Error> {
    parse_id(raw, FieldName::new("id"))
}

/// Paginated listing of active materials.
#[utoipa::path(
    get,
    path = "/api/materials",
    params(MaterialListQuery, PageParamsQuery),
    responses(
        (status = 200, description = "Materials; items are MaterialDto", body = crate::inbound::http::dto::PageSchema),
        (status = 400, description = "Invalid filter", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "listMaterials",
    security((), ("bearerAuth" = []))
)]
#[get("/materials")]
pub async fn list_materials(
    state: web::Data<HttpState>,
    query: web::Query<MaterialListQuery>,
    page: web::Query<PageParamsQuery>,
) -> ApiResult<HttpResponse> {
    let filter = query.into_inner().into_filter()?;
    let page = parse_page(page.into_inner().into())?;
    let materials = state.materials.list(&filter, page).await?;
    Ok(HttpResponse::Ok().json(materials.map(MaterialDto::from)))
}

/// Materials for one subject code only.
#[utoipa::path(
    get,
    path = "/api/materials/subject/{code}",
    params(("code" = String, Path, description = "Subject code"), PageParamsQuery),
    responses(
        (status = 200, description = "Materials; items are MaterialDto", body = crate::inbound::http::dto::PageSchema),
        (status = 400, description = "Invalid code", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "listMaterialsBySubject",
    security((), ("bearerAuth" = []))
)]
#[get("/materials/subject/{code}")]
pub async fn list_by_subject(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    page: web::Query<PageParamsQuery>,
) -> ApiResult<HttpResponse> {
    let code = SubjectCode::new(path.as_str())
        .map_err(|err| invalid_field(FieldName::new("code"), err))?;
    let filter = MaterialFilter {
        subject_code: Some(code),
        ..MaterialFilter::default()
    };
    let page = parse_page(page.into_inner().into())?;
    let materials = state.materials.list(&filter, page).await?;
    Ok(HttpResponse::Ok().json(materials.map(MaterialDto::from)))
}

/// Stream an object stored in R2.
#[utoipa::path(
    get,
    path = "/api/materials/proxy/{key}",
    params(("key" = String, Path, description = "Object key, may contain slashes")),
    responses(
        (status = 200, description = "File bytes"),
        (status = 400, description = "Unsafe key", body = ErrorSchema),
        (status = 404, description = "No such object", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "proxyMaterialFile",
    security([])
)]
#[get("/materials/proxy/{key:.*}")]
pub async fn proxy_file(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let key = ObjectKey::parse(path.as_str())
        .map_err(|err| invalid_field(FieldName::new("key"), err))?;
    let object = state.materials.proxy(&key).await?;
    let content_type = object
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_owned());
    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, content_type))
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(object.bytes))
}

/// One material with the caller's access flag; counts a view.
#[utoipa::path(
    get,
    path = "/api/materials/{id}",
    params(("id" = String, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material", body = MaterialDto),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "getMaterial",
    security((), ("bearerAuth" = []))
)]
#[get("/materials/{id}")]
pub async fn get_material(
    state: web::Data<HttpState>,
    viewer: OptionalUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<MaterialDto>> {
    let id = material_id(&path)?;
    let view = state.materials.view(viewer.as_ref(), &id).await?;
    Ok(web::Json(view.into()))
}

/// Resolve a download URL after the access check.
#[utoipa::path(
    get,
    path = "/api/materials/{id}/download",
    params(("id" = String, Path, description = "Material id")),
    responses(
        (status = 200, description = "Download URL", body = DownloadResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 402, description = "Purchase or subscription required", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "downloadMaterial"
)]
#[get("/materials/{id}/download")]
pub async fn download_material(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    req: HttpRequest,
    path: web::Path<String>,
) -> ApiResult<web::Json<DownloadResponse>> {
    let id = material_id(&path)?;
    let url = state.materials.download(&user, &id, client_ip(&req)).await?;
    Ok(web::Json(DownloadResponse { url }))
}

/// Upload a material.
#[utoipa::path(
    post,
    path = "/api/materials",
    request_body(content_type = "multipart/form-data", description = "`file` plus metadata fields"),
    responses(
        (status = 201, description = "Created", body = MaterialDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "createMaterial"
)]
#[post("/materials")]
pub async fn create_material(
    state: web::Data<HttpState>,
    admin: AdminUser,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = MultipartForm::read(payload).await?;
    let upload = form.take_file("file");
    let draft = draft_from_form(&form, upload.is_some())?;
    let material = state.materials.create(&admin, draft, upload).await?;
    Ok(HttpResponse::Created().json(MaterialDto::from(material)))
}

/// Replace a material's metadata and optionally its file.
#[utoipa::path(
    put,
    path = "/api/materials/{id}",
    params(("id" = String, Path, description = "Material id")),
    request_body(content_type = "multipart/form-data", description = "Metadata fields and an optional `file`"),
    responses(
        (status = 200, description = "Updated", body = MaterialDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "updateMaterial"
)]
#[put("/materials/{id}")]
pub async fn update_material(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
    payload: Multipart,
) -> ApiResult<web::Json<MaterialDto>> {
    let id = material_id(&path)?;
    let mut form = MultipartForm::read(payload).await?;
    let upload = form.take_file("file");
    // The service re-checks the file rule against what is already stored.
    let draft = draft_from_form(&form, true)?;
    let material = state.materials.update(&admin, &id, draft, upload).await?;
    Ok(web::Json(material.into()))
}

/// Delete a material and its stored file.
#[utoipa::path(
    delete,
    path = "/api/materials/{id}",
    params(("id" = String, Path, description = "Material id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "deleteMaterial"
)]
#[delete("/materials/{id}")]
pub async fn delete_material(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id = material_id(&path)?;
    state.materials.delete(&admin, &id).await?;
    Ok(web::Json(MessageResponse::new("Material deleted")))
}
