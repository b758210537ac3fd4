//! User accounts and the normalised identity attached to requests.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AcademicValidationError, Branch, Semester, UserId};

/// Shortest accepted display name.
pub const NAME_MIN: usize = 2;
/// Longest accepted display name.
pub const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 254;

/// Validation errors for user fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// Email did not look like `local@domain.tld`.
    #[error("email address is invalid")]
    InvalidEmail,
    /// Name outside the accepted length.
    #[error("name must be between {min} and {max} characters")]
    NameLength {
        /// Shortest accepted length.
        min: usize,
        /// Longest accepted length.
        max: usize,
    },
    /// Phone number contained something other than digits and a leading `+`.
    #[error("phone number must contain 10 to 15 digits")]
    InvalidPhone,
    /// Students must declare where they study.
    #[error("students must provide a branch and semester")]
    MissingPlacement,
    /// Branch or semester failed validation.
    #[error(transparent)]
    Academic(#[from] AcademicValidationError),
}

/// Lower-cased, syntactically valid email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and normalise an address.
    ///
    /// # Examples
    /// ```
    /// use digidiploma::domain::Email;
    ///
    /// let email = Email::new(" Student@Example.COM ").expect("valid");
    /// assert_eq!(email.as_ref(), "student@example.com");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        if normalised.len() > EMAIL_MAX || normalised.chars().any(char::is_whitespace) {
            return Err(UserValidationError::InvalidEmail);
        }
        let Some((local, domain)) = normalised.split_once('@') else {
            return Err(UserValidationError::InvalidEmail);
        };
        let domain_ok = domain
            .split_once('.')
            .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
            && !domain.contains('@')
            && !domain.ends_with('.');
        if local.is_empty() || !domain_ok {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(normalised))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular learner.
    Student,
    /// Platform operator.
    Admin,
}

impl UserRole {
    /// Lower-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "admin" => Ok(Self::Admin),
            _ => Err(()),
        }
    }
}

/// PHC-formatted password hash. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap an encoded hash produced by a [`crate::domain::ports::PasswordHasher`].
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded PHC string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Pending password reset: SHA-256 of the emailed token and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordReset {
    /// Hex-encoded SHA-256 of the raw token.
    pub token_hash: String,
    /// Instant after which the token is void.
    pub expires_at: DateTime<Utc>,
}

/// Registered account.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub password_hash: PasswordHash,
    pub role: UserRole,
    pub branch: Option<Branch>,
    pub semester: Option<Semester>,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub enrollment_number: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub device_tokens: Vec<String>,
    pub password_reset: Option<PasswordReset>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the account has the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub branch: Option<Branch>,
    pub semester: Option<Semester>,
}

impl CurrentUser {
    /// Whether the caller is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            branch: user.branch.clone(),
            semester: user.semester,
        }
    }
}

/// Trim and length-check a display name.
pub fn validate_name(raw: &str) -> Result<String, UserValidationError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if (NAME_MIN..=NAME_MAX).contains(&len) {
        Ok(trimmed.to_owned())
    } else {
        Err(UserValidationError::NameLength {
            min: NAME_MIN,
            max: NAME_MAX,
        })
    }
}

/// Validate an optional phone number; blank input clears it.
pub fn validate_phone(raw: &str) -> Result<Option<String>, UserValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digit_count = digits.chars().filter(char::is_ascii_digit).count();
    let only_digits = digits
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-');
    if only_digits && (10..=15).contains(&digit_count) {
        Ok(Some(trimmed.to_owned()))
    } else {
        Err(UserValidationError::InvalidPhone)
    }
}

/// Trim free text; blank becomes `None`.
pub fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Self-service profile changes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub branch: Option<Branch>,
    pub semester: Option<Semester>,
    pub enrollment_number: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// Apply the changes to `user`.
    pub fn apply_to(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(phone) = self.phone {
            user.phone = Some(phone);
        }
        if let Some(college) = self.college {
            user.college = Some(college);
        }
        if let Some(branch) = self.branch {
            user.branch = Some(branch);
        }
        if let Some(semester) = self.semester {
            user.semester = Some(semester);
        }
        if let Some(enrollment) = self.enrollment_number {
            user.enrollment_number = Some(enrollment);
        }
        if let Some(avatar) = self.avatar_url {
            user.avatar_url = Some(avatar);
        }
        user.updated_at = now;
    }
}

/// Admin-side user listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub branch: Option<Branch>,
    pub semester: Option<Semester>,
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
}

impl UserFilter {
    /// In-process evaluation used by adapters without query support.
    pub fn matches(&self, user: &User) -> bool {
        let role_ok = self.role.is_none_or(|role| user.role == role);
        let branch_ok = self
            .branch
            .as_ref()
            .is_none_or(|branch| user.branch.as_ref().is_some_and(|b| b.matches(branch)));
        let semester_ok = self.semester.is_none_or(|s| user.semester == Some(s));
        let search_ok = self.search.as_deref().is_none_or(|needle| {
            let needle = needle.to_lowercase();
            user.name.to_lowercase().contains(&needle) || user.email.as_ref().contains(&needle)
        });
        role_ok && branch_ok && semester_ok && search_ok
    }
}
