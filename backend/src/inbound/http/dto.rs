//! Response bodies shared by several handler modules.
//!
//! Domain entities do not derive `Serialize`; each handler module maps them
//! into camelCase DTOs so the wire format can evolve separately from the
//! domain model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{StorageBackend, StoredFile, User};

/// Uploaded file as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileDto {
    /// Where clients fetch the file: a proxy URL or `/uploads/...`.
    pub url: String,
    pub key: String,
    #[schema(value_type = String, example = "r2")]
    pub backend: StorageBackend,
    pub size: u64,
    pub content_type: String,
    pub original_name: String,
}

impl From<&StoredFile> for StoredFileDto {
    fn from(file: &StoredFile) -> Self {
        Self {
            url: file.url.clone(),
            key: file.key.as_ref().to_owned(),
            backend: file.backend,
            size: file.size,
            content_type: file.content_type.clone(),
            original_name: file.original_name.clone(),
        }
    }
}

pub(crate) fn file_dto(file: Option<&StoredFile>) -> Option<StoredFileDto> {
    file.map(StoredFileDto::from)
}

/// Account profile. Secrets such as the password hash never leave the server.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[schema(example = "65f1c0ffee0123456789abcd")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[schema(example = "student")]
    pub role: String,
    pub branch: Option<String>,
    pub semester: Option<u8>,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub enrollment_number: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            email: user.email.to_string(),
            role: user.role.as_str().to_owned(),
            branch: user.branch.map(|b| b.to_string()),
            semester: user.semester.map(|s| s.get()),
            phone: user.phone,
            college: user.college,
            enrollment_number: user.enrollment_number,
            avatar_url: user.avatar_url,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Password updated")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Paginated envelope as documented in OpenAPI; `items` holds the
/// endpoint's item DTO.
#[derive(ToSchema)]
#[serde(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct PageSchema {
    items: Vec<serde_json::Value>,
    #[schema(example = 42)]
    total: u64,
    #[schema(example = 1)]
    page: u32,
    #[schema(example = 20)]
    limit: u32,
    #[schema(example = 3)]
    total_pages: u64,
}

/// `?page=&limit=` parameters shared by list endpoints.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParamsQuery {
    /// One-based page number (default 1).
    pub page: Option<u32>,
    /// Page size, at most 100 (default 20).
    pub limit: Option<u32>,
}

impl From<PageParamsQuery> for pagination::PageQuery {
    fn from(query: PageParamsQuery) -> Self {
        Self {
            page: query.page,
            limit: query.limit,
        }
    }
}
