//! Port abstraction for access token issuing and verification.
use chrono::{DateTime, Utc};

use crate::domain::{ExpiryPolicy, IssuedToken, TokenClaims, User};

use super::define_port_error;

define_port_error! {
    /// Errors raised while issuing or decoding tokens.
    pub enum TokenError {
        /// Signature, structure, or algorithm is wrong.
        Invalid { message: String } => "invalid token: {message}",
        /// The token is past what the expiry policy tolerates.
        Expired => "token expired",
        /// Signing failed.
        Signing { message: String } => "token signing failed: {message}",
    }
}

/// Port for signed access tokens.
#[cfg_attr(test, mockall::automock)]
pub trait TokenService: Send + Sync {
    /// Issue a token for `user` at `now`.
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, TokenError>;

    /// Verify and decode `token`, applying `policy` to its expiry.
    fn decode(
        &self,
        token: &str,
        policy: ExpiryPolicy,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError>;
}
