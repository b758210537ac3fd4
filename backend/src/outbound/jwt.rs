//! HS256 access tokens for the [`TokenService`] port.
//!
//! The library's own `exp` check is disabled; expiry is judged by the
//! caller's [`ExpiryPolicy`] so that refresh can accept recently expired
//! tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use zeroize::Zeroizing;

use crate::domain::ports::{TokenError, TokenService};
use crate::domain::{ExpiryPolicy, IssuedToken, TokenClaims, User};

/// Signs and verifies bearer tokens with a shared secret.
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl JwtTokenService {
    pub fn new(secret: &Zeroizing<String>, lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = now + self.lifetime;
        let claims = TokenClaims {
            sub: user.id.to_string(),
            email: user.email.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenError::signing(err.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    fn decode(
        &self,
        token: &str,
        policy: ExpiryPolicy,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &Self::validation())
            .map_err(|err| TokenError::invalid(err.to_string()))?;
        if !policy.accepts(&data.claims, now) {
            return Err(TokenError::expired());
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use crate::domain::test_fixtures::{fixture_timestamp, user};
    use rstest::{fixture, rstest};

    #[fixture]
    fn service() -> JwtTokenService {
        JwtTokenService::new(&Zeroizing::new("test-secret".into()), Duration::hours(1))
    }

    #[rstest]
    fn issued_tokens_decode_to_the_user(service: JwtTokenService) {
        let now = fixture_timestamp();
        let admin = user(UserRole::Admin);
        let issued = service.issue(&admin, now).expect("issue");
        assert_eq!(issued.expires_at, now + Duration::hours(1));

        let claims = service
            .decode(&issued.token, ExpiryPolicy::Strict, now)
            .expect("decode");
        assert_eq!(claims.user_id(), Some(admin.id));
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[rstest]
    #[case(ExpiryPolicy::Strict, Duration::hours(2), false)]
    #[case(ExpiryPolicy::WithinGrace(Duration::days(30)), Duration::days(2), true)]
    #[case(ExpiryPolicy::WithinGrace(Duration::days(30)), Duration::days(31), false)]
    fn expiry_follows_the_policy(
        service: JwtTokenService,
        #[case] policy: ExpiryPolicy,
        #[case] later: Duration,
        #[case] accepted: bool,
    ) {
        let now = fixture_timestamp();
        let issued = service.issue(&user(UserRole::Student), now).expect("issue");
        let result = service.decode(&issued.token, policy, now + later);
        assert_eq!(result.is_ok(), accepted);
        if !accepted {
            assert_eq!(result, Err(TokenError::Expired));
        }
    }

    #[rstest]
    fn rejects_tokens_signed_with_another_secret(service: JwtTokenService) {
        let other = JwtTokenService::new(&Zeroizing::new("other".into()), Duration::hours(1));
        let now = fixture_timestamp();
        let issued = other.issue(&user(UserRole::Student), now).expect("issue");
        assert!(matches!(
            service.decode(&issued.token, ExpiryPolicy::Strict, now),
            Err(TokenError::Invalid { .. })
        ));
    }
}
