//! Authentication primitives: credentials, registration, and token claims.
//!
//! Inbound adapters turn raw strings into these types before talking to the
//! account service, so validation rules live in one place.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{Branch, Email, Semester, UserId, UserRole, UserValidationError};

/// Shortest accepted password.
pub const PASSWORD_MIN: usize = 6;
/// Longest accepted password.
pub const PASSWORD_MAX: usize = 128;

/// Domain error returned when login or registration values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Email was missing or malformed.
    InvalidEmail,
    /// Password was blank.
    EmptyPassword,
    /// New password length outside [`PASSWORD_MIN`]..=[`PASSWORD_MAX`].
    PasswordLength,
    /// Another user field failed validation.
    Field(UserValidationError),
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail => write!(f, "email address is invalid"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
            Self::PasswordLength => write!(
                f,
                "password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters"
            ),
            Self::Field(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for LoginValidationError {}

impl From<UserValidationError> for LoginValidationError {
    fn from(value: UserValidationError) -> Self {
        match value {
            UserValidationError::InvalidEmail => Self::InvalidEmail,
            other => Self::Field(other),
        }
    }
}

/// Validated login credentials.
///
/// ## Invariants
/// - `email` is lower-cased and syntactically valid.
/// - `password` is non-empty and kept verbatim, zeroised on drop.
///
/// # Examples
/// ```
/// use digidiploma::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("Ada@Example.com", "secret").unwrap();
/// assert_eq!(creds.email().as_ref(), "ada@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: Email,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, LoginValidationError> {
        let email = Email::new(email).map_err(|_| LoginValidationError::InvalidEmail)?;
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email used for the lookup.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Password supplied by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// A password chosen by the user, checked against the length policy.
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(Zeroizing<String>);

impl NewPassword {
    /// Validate a new password.
    pub fn new(raw: &str) -> Result<Self, LoginValidationError> {
        let len = raw.chars().count();
        if (PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
            Ok(Self(Zeroizing::new(raw.to_owned())))
        } else {
            Err(LoginValidationError::PasswordLength)
        }
    }

    /// Plain-text value, for hashing only.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NewPassword(<redacted>)")
    }
}

/// Validated self-registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: NewPassword,
    pub branch: Branch,
    pub semester: Semester,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub enrollment_number: Option<String>,
}

/// Claims carried by access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user id.
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl TokenClaims {
    /// The subject as a typed id, if well formed.
    pub fn user_id(&self) -> Option<UserId> {
        UserId::new(&self.sub).ok()
    }

    /// Whether the token is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// How strictly token expiry is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Expired tokens are rejected.
    Strict,
    /// Tokens expired no longer than the grace window ago are accepted.
    WithinGrace(chrono::Duration),
}

impl ExpiryPolicy {
    /// Whether `claims` are acceptable at `now`.
    pub fn accepts(self, claims: &TokenClaims, now: DateTime<Utc>) -> bool {
        match self {
            Self::Strict => !claims.is_expired_at(now),
            Self::WithinGrace(grace) => {
                let cutoff = now - grace;
                claims.exp > cutoff.timestamp()
            }
        }
    }
}

/// Signed access token with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
