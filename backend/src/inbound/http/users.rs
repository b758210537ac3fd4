//! Account endpoints: registration, sign-in, profile, passwords, and the
//! admin user directory.
//!
//! ```text
//! POST   /api/users/register          {"name","email","password","branch","semester"}
//! POST   /api/users/login             {"email","password"}
//! POST   /api/users/refresh-token
//! GET    /api/users/me
//! PUT    /api/users/me
//! POST   /api/users/me/avatar         multipart: avatar
//! POST   /api/users/me/device-tokens  {"token"}
//! POST   /api/users/change-password   {"currentPassword","newPassword"}
//! POST   /api/users/forgot-password   {"email"}
//! POST   /api/users/reset-password    {"token","password"}
//! GET    /api/users                   admin
//! PATCH  /api/users/{id}/status       admin
//! PATCH  /api/users/{id}/role         admin
//! DELETE /api/users/{id}              admin
//! ```

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::user::{optional_text, validate_name, validate_phone};
use crate::domain::{
    AuthSession, Branch, Error, IssuedToken, LoginCredentials, LoginValidationError, NewPassword,
    ProfileUpdate, Registration, Semester, UserFilter, UserId, UserRole, UserValidationError,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AdminUser, AuthenticatedUser, RefreshableUser, client_ip};
use crate::inbound::http::dto::{MessageResponse, PageParamsQuery, UserDto};
use crate::inbound::http::multipart::MultipartForm;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_field, missing_field_error, parse_branch, parse_email,
    parse_id, parse_keyword, parse_optional_keyword, parse_page, parse_semester,
};

const ROLES: &str = "student, admin";

/// Body for `POST /api/users/register`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "Asha Patil")]
    pub name: String,
    #[schema(example = "asha@example.in")]
    pub email: String,
    pub password: String,
    #[schema(example = "Computer Engineering")]
    pub branch: String,
    #[schema(example = 3)]
    pub semester: u8,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub enrollment_number: Option<String>,
}

impl RegisterRequest {
    fn into_registration(self) -> Result<Registration, Error> {
        let name = validate_name(&self.name).map_err(user_error)?;
        let email = parse_email(&self.email, FieldName::new("email"))?;
        let password = NewPassword::new(&self.password).map_err(login_error)?;
        let branch = Branch::new(&self.branch)
            .map_err(|err| invalid_field(FieldName::new("branch"), err))?;
        let semester = Semester::new(self.semester)
            .map_err(|err| invalid_field(FieldName::new("semester"), err))?;
        let phone = match self.phone.as_deref() {
            Some(raw) => validate_phone(raw).map_err(user_error)?,
            None => None,
        };
        Ok(Registration {
            name,
            email,
            password,
            branch,
            semester,
            phone,
            college: optional_text(self.college.as_deref()),
            enrollment_number: optional_text(self.enrollment_number.as_deref()),
        })
    }
}

/// Body for `POST /api/users/login`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "asha@example.in")]
    pub email: String,
    pub password: String,
}

/// Signed access token.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            expires_at: issued.expires_at,
        }
    }
}

/// Token plus the signed-in profile.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserDto,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token.token,
            expires_at: session.token.expires_at,
            user: session.user.into(),
        }
    }
}

/// Body for `PUT /api/users/me`. Absent fields stay unchanged.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub branch: Option<String>,
    pub semester: Option<u8>,
    pub enrollment_number: Option<String>,
    pub avatar_url: Option<String>,
}

impl UpdateProfileRequest {
    fn into_update(self) -> Result<ProfileUpdate, Error> {
        let name = self
            .name
            .as_deref()
            .map(validate_name)
            .transpose()
            .map_err(user_error)?;
        let phone = match self.phone.as_deref() {
            Some(raw) => validate_phone(raw).map_err(user_error)?,
            None => None,
        };
        Ok(ProfileUpdate {
            name,
            phone,
            college: optional_text(self.college.as_deref()),
            branch: parse_branch(self.branch.as_deref(), FieldName::new("branch"))?,
            semester: parse_semester(self.semester, FieldName::new("semester"))?,
            enrollment_number: optional_text(self.enrollment_number.as_deref()),
            avatar_url: optional_text(self.avatar_url.as_deref()),
        })
    }
}

/// Body for `POST /api/users/change-password`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Body for `POST /api/users/forgot-password`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Body for `POST /api/users/reset-password`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Body for `POST /api/users/me/device-tokens`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct DeviceTokenRequest {
    pub token: String,
}

/// Body for `PATCH /api/users/{id}/status`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusRequest {
    pub is_active: bool,
}

/// Body for `PATCH /api/users/{id}/role`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UserRoleRequest {
    #[schema(example = "admin")]
    pub role: String,
}

/// Filters for `GET /api/users`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub branch: Option<String>,
    pub semester: Option<u8>,
    /// Case-insensitive match on name, email, or enrollment number.
    pub search: Option<String>,
}

fn user_error(err: UserValidationError) -> Error {
    let field = match err {
        UserValidationError::InvalidEmail => "email",
        UserValidationError::NameLength { .. } => "name",
        UserValidationError::InvalidPhone => "phone",
        UserValidationError::MissingPlacement | UserValidationError::Academic(_) => "branch",
    };
    invalid_field(FieldName::new(field), err)
}

fn login_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::InvalidEmail => {
            invalid_field(FieldName::new("email"), "email address is invalid")
        }
        LoginValidationError::EmptyPassword => missing_field_error(FieldName::new("password")),
        LoginValidationError::PasswordLength => {
            invalid_field(FieldName::new("password"), LoginValidationError::PasswordLength)
        }
        LoginValidationError::Field(inner) => user_error(inner),
    }
}

fn user_path_id(raw: &str) -> Result<UserId, Error> {
    parse_id(raw, FieldName::new("id"))
}

/// Create a student account.
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Email already registered", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "register",
    security([])
)]
#[post("/users/register")]
pub async fn register(
    state: web::Data<HttpState>,
    req: HttpRequest,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let registration = payload.into_inner().into_registration()?;
    let session = state.accounts.register(registration, client_ip(&req)).await?;
    Ok(HttpResponse::Created().json(AuthResponse::from(session)))
}

/// Exchange credentials for a token.
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials or inactive account", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "login",
    security([])
)]
#[post("/users/login")]
pub async fn login(
    state: web::Data<HttpState>,
    req: HttpRequest,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<AuthResponse>> {
    let LoginRequest { email, password } = payload.into_inner();
    let credentials = LoginCredentials::try_from_parts(&email, &password).map_err(login_error)?;
    let session = state.accounts.login(&credentials, client_ip(&req)).await?;
    Ok(web::Json(session.into()))
}

/// Issue a fresh token; accepts tokens expired within the grace window.
#[utoipa::path(
    post,
    path = "/api/users/refresh-token",
    responses(
        (status = 200, description = "New token", body = TokenResponse),
        (status = 401, description = "Token missing, invalid, or past the grace window", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "refreshToken"
)]
#[post("/users/refresh-token")]
pub async fn refresh_token(
    state: web::Data<HttpState>,
    user: RefreshableUser,
) -> ApiResult<web::Json<TokenResponse>> {
    let issued = state.accounts.refresh(&user.0)?;
    Ok(web::Json(issued.into()))
}

/// Current profile.
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Profile", body = UserDto),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<UserDto>> {
    let profile = state.accounts.profile(&user.id).await?;
    Ok(web::Json(profile.into()))
}

/// Update the caller's profile.
#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "updateProfile"
)]
#[put("/users/me")]
pub async fn update_profile(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<UpdateProfileRequest>,
) -> ApiResult<web::Json<UserDto>> {
    let update = payload.into_inner().into_update()?;
    let profile = state.accounts.update_profile(&user.id, update).await?;
    Ok(web::Json(profile.into()))
}

/// Upload a profile picture (multipart field `avatar`).
#[utoipa::path(
    post,
    path = "/api/users/me/avatar",
    request_body(content_type = "multipart/form-data", description = "Image under the `avatar` field"),
    responses(
        (status = 200, description = "Updated profile", body = UserDto),
        (status = 400, description = "Missing file", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "uploadAvatar"
)]
#[post("/users/me/avatar")]
pub async fn upload_avatar(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: Multipart,
) -> ApiResult<web::Json<UserDto>> {
    let mut form = MultipartForm::read(payload).await?;
    let upload = form
        .take_file("avatar")
        .ok_or_else(|| missing_field_error(FieldName::new("avatar")))?;
    if !upload.content_type.starts_with("image/") {
        return Err(invalid_field(FieldName::new("avatar"), "avatar must be an image"));
    }
    let profile = state.accounts.set_avatar(&user.id, upload).await?;
    Ok(web::Json(profile.into()))
}

/// Register a push notification device token.
#[utoipa::path(
    post,
    path = "/api/users/me/device-tokens",
    request_body = DeviceTokenRequest,
    responses(
        (status = 204, description = "Token stored"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "addDeviceToken"
)]
#[post("/users/me/device-tokens")]
pub async fn add_device_token(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<DeviceTokenRequest>,
) -> ApiResult<HttpResponse> {
    state
        .accounts
        .add_device_token(&user.id, &payload.token)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Change password after confirming the current one.
#[utoipa::path(
    post,
    path = "/api/users/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Current password is wrong", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "changePassword"
)]
#[post("/users/change-password")]
pub async fn change_password(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<ChangePasswordRequest>,
) -> ApiResult<web::Json<MessageResponse>> {
    let ChangePasswordRequest {
        current_password,
        new_password,
    } = payload.into_inner();
    if current_password.is_empty() {
        return Err(missing_field_error(FieldName::new("currentPassword")));
    }
    let new_password = NewPassword::new(&new_password).map_err(login_error)?;
    state
        .accounts
        .change_password(&user.id, &current_password, &new_password)
        .await?;
    Ok(web::Json(MessageResponse::new("Password updated")))
}

/// Start a password reset. Always answers 200 so addresses cannot be probed.
#[utoipa::path(
    post,
    path = "/api/users/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent when the account exists", body = MessageResponse),
        (status = 400, description = "Malformed email", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "forgotPassword",
    security([])
)]
#[post("/users/forgot-password")]
pub async fn forgot_password(
    state: web::Data<HttpState>,
    payload: web::Json<ForgotPasswordRequest>,
) -> ApiResult<web::Json<MessageResponse>> {
    let email = parse_email(&payload.email, FieldName::new("email"))?;
    state.accounts.forgot_password(&email).await?;
    Ok(web::Json(MessageResponse::new(
        "If that email is registered, a reset link is on its way",
    )))
}

/// Finish a password reset with the emailed token.
#[utoipa::path(
    post,
    path = "/api/users/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "resetPassword",
    security([])
)]
#[post("/users/reset-password")]
pub async fn reset_password(
    state: web::Data<HttpState>,
    payload: web::Json<ResetPasswordRequest>,
) -> ApiResult<web::Json<MessageResponse>> {
    let ResetPasswordRequest { token, password } = payload.into_inner();
    let password = NewPassword::new(&password).map_err(login_error)?;
    state.accounts.reset_password(&token, &password).await?;
    Ok(web::Json(MessageResponse::new("Password has been reset")))
}

/// Paginated user directory.
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserListQuery, PageParamsQuery),
    responses(
        (status = 200, description = "Users", body = crate::inbound::http::dto::PageSchema),
        (status = 400, description = "Invalid filter", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    _admin: AdminUser,
    query: web::Query<UserListQuery>,
    page: web::Query<PageParamsQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let filter = UserFilter {
        role: parse_optional_keyword(query.role.as_deref(), FieldName::new("role"), ROLES)?,
        branch: parse_branch(query.branch.as_deref(), FieldName::new("branch"))?,
        semester: parse_semester(query.semester, FieldName::new("semester"))?,
        search: optional_text(query.search.as_deref()),
    };
    let page = parse_page(page.into_inner().into())?;
    let users = state.accounts.list_users(&filter, page).await?;
    Ok(HttpResponse::Ok().json(users.map(UserDto::from)))
}

/// Activate or deactivate an account.
#[utoipa::path(
    patch,
    path = "/api/users/{id}/status",
    params(("id" = String, Path, description = "User id")),
    request_body = UserStatusRequest,
    responses(
        (status = 200, description = "Updated user", body = UserDto),
        (status = 400, description = "Invalid id or own account", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "setUserStatus"
)]
#[patch("/users/{id}/status")]
pub async fn set_user_status(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
    payload: web::Json<UserStatusRequest>,
) -> ApiResult<web::Json<UserDto>> {
    let id = user_path_id(&path)?;
    let user = state
        .accounts
        .set_active(&admin, &id, payload.is_active)
        .await?;
    Ok(web::Json(user.into()))
}

/// Change an account's role.
#[utoipa::path(
    patch,
    path = "/api/users/{id}/role",
    params(("id" = String, Path, description = "User id")),
    request_body = UserRoleRequest,
    responses(
        (status = 200, description = "Updated user", body = UserDto),
        (status = 400, description = "Invalid role or own account", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "setUserRole"
)]
#[patch("/users/{id}/role")]
pub async fn set_user_role(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
    payload: web::Json<UserRoleRequest>,
) -> ApiResult<web::Json<UserDto>> {
    let id = user_path_id(&path)?;
    let role: UserRole = parse_keyword(&payload.role, FieldName::new("role"), ROLES)?;
    let user = state.accounts.set_role(&admin, &id, role).await?;
    Ok(web::Json(user.into()))
}

/// Delete an account.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Invalid id or own account", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = user_path_id(&path)?;
    state.accounts.delete_user(&admin, &id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted" })))
}
