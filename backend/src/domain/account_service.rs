//! Account use-cases: registration, login, tokens, profiles, and admin user
//! management.

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;
use pagination::{PageParams, Paginated};
use rand::RngCore;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::domain::email_templates;
use crate::domain::user::validate_name;
use crate::domain::ports::{
    Mailer, PasswordHashError, PasswordHasher, TokenError, TokenService, UserRepository,
};
use crate::domain::{
    AuditAction, AuditEntry, AuditRecorder, CurrentUser, Email, Error, ExpiryPolicy, FileStorage,
    FileUpload, IssuedToken, LoginCredentials, NewPassword, PasswordHash, PasswordReset,
    ProfileUpdate, Registration, User, UserFilter, UserId, UserRole,
};

/// Lifetime of a password reset token.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Token plus the account it was issued for.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: IssuedToken,
    pub user: User,
}

/// Account service.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
    mailer: Arc<dyn Mailer>,
    storage: FileStorage,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
    reset_url: String,
}

impl AccountService {
    #[expect(clippy::too_many_arguments, reason = "service wiring takes every port")]
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
        mailer: Arc<dyn Mailer>,
        storage: FileStorage,
        audit: AuditRecorder,
        clock: Arc<dyn Clock>,
        reset_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            mailer,
            storage,
            audit,
            clock,
            reset_url: reset_url.into(),
        }
    }

    /// Create a student account and sign it in.
    pub async fn register(
        &self,
        registration: Registration,
        ip: Option<String>,
    ) -> Result<AuthSession, Error> {
        if self.users.find_by_email(&registration.email).await?.is_some() {
            return Err(email_taken());
        }
        let password_hash = self.hash(registration.password.expose()).await?;
        let now = self.clock.utc();
        let user = User {
            id: UserId::random(),
            name: registration.name,
            email: registration.email,
            password_hash,
            role: UserRole::Student,
            branch: Some(registration.branch),
            semester: Some(registration.semester),
            phone: registration.phone,
            college: registration.college,
            enrollment_number: registration.enrollment_number,
            avatar_url: None,
            is_active: true,
            device_tokens: Vec::new(),
            password_reset: None,
            last_login_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        // The unique index still catches a concurrent registration.
        self.users.insert(&user).await.map_err(|err| match err {
            crate::domain::ports::RepositoryError::Duplicate { .. } => email_taken(),
            other => other.into(),
        })?;
        info!(user_id = %user.id, "user registered");

        if let Err(err) = self.mailer.send(&email_templates::welcome(&user)).await {
            warn!(error = %err, user_id = %user.id, "welcome email not sent");
        }
        self.audit
            .record(
                AuditEntry::new(AuditAction::UserRegistered, Some(&user.id))
                    .target(&user.email)
                    .ip(ip),
            )
            .await;

        let token = self.issue(&user)?;
        Ok(AuthSession { token, user })
    }

    /// Check credentials and sign in.
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
        ip: Option<String>,
    ) -> Result<AuthSession, Error> {
        let Some(mut user) = self.users.find_by_email(credentials.email()).await? else {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };
        if !self.verify(credentials.password(), &user.password_hash).await? {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }
        if !user.is_active {
            return Err(Error::unauthorized("Account is deactivated"));
        }
        let now = self.clock.utc();
        user.last_login_at = Some(now);
        user.updated_at = now;
        self.users.update(&user).await?;
        self.audit
            .record(AuditEntry::new(AuditAction::UserLoggedIn, Some(&user.id)).ip(ip))
            .await;
        let token = self.issue(&user)?;
        Ok(AuthSession { token, user })
    }

    /// Resolve a bearer token to an active account.
    pub async fn authenticate(&self, token: &str, policy: ExpiryPolicy) -> Result<User, Error> {
        let claims = self
            .tokens
            .decode(token, policy, self.clock.utc())
            .map_err(map_token_error)?;
        let id = claims
            .user_id()
            .ok_or_else(|| Error::unauthorized("Invalid token"))?;
        self.users
            .find_by_id(&id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| Error::unauthorized("User not found or inactive"))
    }

    /// Issue a fresh token for an already authenticated account.
    pub fn refresh(&self, user: &User) -> Result<IssuedToken, Error> {
        self.issue(user)
    }

    /// Load an account.
    pub async fn profile(&self, id: &UserId) -> Result<User, Error> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// Apply profile edits.
    pub async fn update_profile(&self, id: &UserId, update: ProfileUpdate) -> Result<User, Error> {
        let mut user = self.profile(id).await?;
        update.apply_to(&mut user, self.clock.utc());
        self.users.update(&user).await?;
        Ok(user)
    }

    /// Replace the avatar image, removing the previous file.
    pub async fn set_avatar(&self, id: &UserId, upload: FileUpload) -> Result<User, Error> {
        if !upload.content_type.starts_with("image/") {
            return Err(Error::invalid_request("Avatar must be an image"));
        }
        let mut user = self.profile(id).await?;
        let stored = self.storage.upload(upload, "avatars").await?;
        let previous = user.avatar_url.replace(stored.url);
        user.updated_at = self.clock.utc();
        self.users.update(&user).await?;
        if let Some(previous) = previous {
            self.storage.delete_quietly(&previous).await;
        }
        Ok(user)
    }

    /// Change the password after checking the current one.
    pub async fn change_password(
        &self,
        id: &UserId,
        current: &str,
        new_password: &NewPassword,
    ) -> Result<(), Error> {
        let mut user = self.profile(id).await?;
        if !self.verify(current, &user.password_hash).await? {
            return Err(Error::unauthorized("Current password is incorrect"));
        }
        user.password_hash = self.hash(new_password.expose()).await?;
        user.updated_at = self.clock.utc();
        self.users.update(&user).await?;
        self.audit
            .record(AuditEntry::new(AuditAction::PasswordChanged, Some(&user.id)))
            .await;
        Ok(())
    }

    /// Start a password reset. Succeeds whether or not the account exists.
    pub async fn forgot_password(&self, email: &Email) -> Result<(), Error> {
        let Some(mut user) = self.users.find_by_email(email).await? else {
            info!("password reset requested for unknown email");
            return Ok(());
        };
        let token = generate_reset_token();
        let now = self.clock.utc();
        user.password_reset = Some(PasswordReset {
            token_hash: hash_reset_token(&token),
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        });
        user.updated_at = now;
        self.users.update(&user).await?;
        let message = email_templates::password_reset(&user, &token, &self.reset_url);
        if let Err(err) = self.mailer.send(&message).await {
            warn!(error = %err, user_id = %user.id, "password reset email not sent");
        }
        Ok(())
    }

    /// Finish a password reset.
    pub async fn reset_password(&self, token: &str, new_password: &NewPassword) -> Result<(), Error> {
        let invalid = || Error::invalid_request("Reset token is invalid or has expired");
        let token = token.trim();
        if token.is_empty() {
            return Err(invalid());
        }
        let mut user = self
            .users
            .find_by_reset_token_hash(&hash_reset_token(token))
            .await?
            .ok_or_else(invalid)?;
        let now = self.clock.utc();
        if user.password_reset.as_ref().is_none_or(|r| r.expires_at <= now) {
            return Err(invalid());
        }
        user.password_hash = self.hash(new_password.expose()).await?;
        user.password_reset = None;
        user.updated_at = now;
        self.users.update(&user).await?;
        self.audit
            .record(AuditEntry::new(AuditAction::PasswordReset, Some(&user.id)))
            .await;
        Ok(())
    }

    /// Remember a push token for the account.
    pub async fn add_device_token(&self, id: &UserId, token: &str) -> Result<(), Error> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::invalid_request("Device token is required"));
        }
        let mut user = self.profile(id).await?;
        if user.device_tokens.iter().any(|t| t == token) {
            return Ok(());
        }
        user.device_tokens.push(token.to_owned());
        user.updated_at = self.clock.utc();
        self.users.update(&user).await?;
        Ok(())
    }

    /// Admin listing.
    pub async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageParams,
    ) -> Result<Paginated<User>, Error> {
        Ok(self.users.list(filter, page).await?)
    }

    /// Activate or deactivate an account.
    pub async fn set_active(
        &self,
        admin: &CurrentUser,
        id: &UserId,
        active: bool,
    ) -> Result<User, Error> {
        reject_self_change(admin, id)?;
        let mut user = self.profile(id).await?;
        user.is_active = active;
        user.updated_at = self.clock.utc();
        self.users.update(&user).await?;
        self.audit
            .record(
                AuditEntry::new(AuditAction::UserStatusChanged, Some(&admin.id))
                    .target(id)
                    .details(json!({ "isActive": active })),
            )
            .await;
        Ok(user)
    }

    /// Change an account's role.
    pub async fn set_role(
        &self,
        admin: &CurrentUser,
        id: &UserId,
        role: UserRole,
    ) -> Result<User, Error> {
        reject_self_change(admin, id)?;
        let mut user = self.profile(id).await?;
        user.role = role;
        user.updated_at = self.clock.utc();
        self.users.update(&user).await?;
        self.audit
            .record(
                AuditEntry::new(AuditAction::UserRoleChanged, Some(&admin.id))
                    .target(id)
                    .details(json!({ "role": role.as_str() })),
            )
            .await;
        Ok(user)
    }

    /// Remove an account and its avatar.
    pub async fn delete_user(&self, admin: &CurrentUser, id: &UserId) -> Result<(), Error> {
        reject_self_change(admin, id)?;
        let user = self.profile(id).await?;
        if !self.users.delete(id).await? {
            return Err(Error::not_found("User not found"));
        }
        if let Some(avatar) = &user.avatar_url {
            self.storage.delete_quietly(avatar).await;
        }
        self.audit
            .record(AuditEntry::new(AuditAction::UserDeleted, Some(&admin.id)).target(id))
            .await;
        Ok(())
    }

    /// Create an active administrator, or promote and re-key an existing
    /// account with the same email. Returns the account and whether it was
    /// created.
    pub async fn ensure_admin(
        &self,
        name: &str,
        email: Email,
        password: &NewPassword,
    ) -> Result<(User, bool), Error> {
        let name = validate_name(name).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({ "field": "name" }))
        })?;
        let password_hash = self.hash(password.expose()).await?;
        let now = self.clock.utc();

        if let Some(mut existing) = self.users.find_by_email(&email).await? {
            existing.role = UserRole::Admin;
            existing.is_active = true;
            existing.password_hash = password_hash;
            existing.password_reset = None;
            existing.updated_at = now;
            self.users.update(&existing).await?;
            info!(user_id = %existing.id, "account promoted to admin");
            self.audit
                .record(
                    AuditEntry::new(AuditAction::UserRoleChanged, None)
                        .target(&existing.id)
                        .details(json!({ "role": UserRole::Admin.as_str() })),
                )
                .await;
            return Ok((existing, false));
        }

        let admin = User {
            id: UserId::random(),
            name,
            email,
            password_hash,
            role: UserRole::Admin,
            branch: None,
            semester: None,
            phone: None,
            college: None,
            enrollment_number: None,
            avatar_url: None,
            is_active: true,
            device_tokens: Vec::new(),
            password_reset: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(&admin).await.map_err(|err| match err {
            crate::domain::ports::RepositoryError::Duplicate { .. } => email_taken(),
            other => other.into(),
        })?;
        info!(user_id = %admin.id, "admin account created");
        self.audit
            .record(AuditEntry::new(AuditAction::UserRegistered, None).target(&admin.email))
            .await;
        Ok((admin, true))
    }

    fn issue(&self, user: &User) -> Result<IssuedToken, Error> {
        self.tokens
            .issue(user, self.clock.utc())
            .map_err(map_token_error)
    }

    async fn hash(&self, password: &str) -> Result<PasswordHash, Error> {
        let hasher = Arc::clone(&self.hasher);
        let password = zeroize::Zeroizing::new(password.to_owned());
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| Error::internal(format!("password hashing task failed: {err}")))?
            .map_err(map_hash_error)
    }

    async fn verify(&self, password: &str, hash: &PasswordHash) -> Result<bool, Error> {
        let hasher = Arc::clone(&self.hasher);
        let password = zeroize::Zeroizing::new(password.to_owned());
        let hash = hash.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|err| Error::internal(format!("password check task failed: {err}")))?
            .map_err(map_hash_error)
    }
}

fn email_taken() -> Error {
    Error::conflict("User already exists with this email")
        .with_details(json!({ "field": "email", "code": "duplicate_email" }))
}

fn reject_self_change(admin: &CurrentUser, id: &UserId) -> Result<(), Error> {
    if &admin.id == id {
        return Err(Error::invalid_request(
            "Administrators cannot change their own account here",
        ));
    }
    Ok(())
}

fn map_token_error(err: TokenError) -> Error {
    match err {
        TokenError::Expired => Error::unauthorized("Token expired"),
        TokenError::Invalid { .. } => Error::unauthorized("Invalid token"),
        TokenError::Signing { message } => Error::internal(message),
    }
}

fn map_hash_error(err: PasswordHashError) -> Error {
    Error::internal(err.to_string())
}

fn generate_reset_token() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of a reset token, hex encoded. Only the hash is stored.
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
