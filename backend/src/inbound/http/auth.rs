//! Bearer-token extractors used by HTTP handlers.
//!
//! Handlers declare the access level they need through their argument types:
//!
//! - [`AuthenticatedUser`]: valid, unexpired token for an active account.
//! - [`AdminUser`]: as above, with the admin role.
//! - [`OptionalUser`]: anonymous when the token is missing or unusable.
//! - [`RefreshableUser`]: accepts tokens expired within the refresh grace
//!   window; only the refresh endpoint uses it.
//!
//! Keeping the checks here leaves the handler modules focused on
//! request/response mapping.

use std::ops::Deref;

use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use tracing::debug;

use crate::domain::{CurrentUser, Error, ExpiryPolicy, User};

use super::state::HttpState;

const BEARER_PREFIX: &str = "Bearer ";

/// The token carried by an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .get(..BEARER_PREFIX.len())
                .filter(|prefix| prefix.eq_ignore_ascii_case(BEARER_PREFIX))
                .and_then(|_| value.get(BEARER_PREFIX.len()..))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Best-effort client address for audit records.
pub fn client_ip(req: &HttpRequest) -> Option<String> {
    req.connection_info().realip_remote_addr().map(str::to_owned)
}

fn http_state(req: &HttpRequest) -> Result<web::Data<HttpState>, Error> {
    req.app_data::<web::Data<HttpState>>()
        .cloned()
        .ok_or_else(|| Error::internal("HTTP state is not configured"))
}

/// Resolve the request's bearer token to an active account under `policy`.
fn resolve(
    req: &HttpRequest,
    policy: impl FnOnce(&HttpState) -> ExpiryPolicy + 'static,
) -> LocalBoxFuture<'static, Result<User, Error>> {
    let token = bearer_token(req.headers()).map(str::to_owned);
    let state = http_state(req);
    Box::pin(async move {
        let state = state?;
        let token = token.ok_or_else(|| Error::unauthorized("Authentication required"))?;
        let policy = policy(&state);
        state.accounts.authenticate(&token, policy).await
    })
}

/// Caller with a valid, unexpired token for an active account.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub CurrentUser);

impl AuthenticatedUser {
    pub fn into_inner(self) -> CurrentUser {
        self.0
    }
}

impl Deref for AuthenticatedUser {
    type Target = CurrentUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let fut = resolve(req, |_| ExpiryPolicy::Strict);
        Box::pin(async move {
            let user = fut.await?;
            Ok(Self(CurrentUser::from(&user)))
        })
    }
}

/// Authenticated caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl Deref for AdminUser {
    type Target = CurrentUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AdminUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let fut = resolve(req, |_| ExpiryPolicy::Strict);
        Box::pin(async move {
            let user = fut.await?;
            if !user.is_admin() {
                debug!(user_id = %user.id, "admin route refused");
                return Err(Error::forbidden("Admin access required").into());
            }
            Ok(Self(CurrentUser::from(&user)))
        })
    }
}

/// Caller identity when a usable token is present; never rejects.
#[derive(Debug, Clone, Default)]
pub struct OptionalUser(pub Option<CurrentUser>);

impl OptionalUser {
    pub fn as_ref(&self) -> Option<&CurrentUser> {
        self.0.as_ref()
    }
}

impl FromRequest for OptionalUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        if bearer_token(req.headers()).is_none() {
            return Box::pin(async { Ok(Self(None)) });
        }
        let fut = resolve(req, |_| ExpiryPolicy::Strict);
        Box::pin(async move {
            match fut.await {
                Ok(user) => Ok(Self(Some(CurrentUser::from(&user)))),
                Err(err) => {
                    debug!(error = %err, "ignoring unusable token on optional route");
                    Ok(Self(None))
                }
            }
        })
    }
}

/// Account whose token may have expired within the refresh grace window.
#[derive(Debug, Clone)]
pub struct RefreshableUser(pub User);

impl FromRequest for RefreshableUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let fut = resolve(req, |state| ExpiryPolicy::WithinGrace(state.refresh_grace));
        Box::pin(async move { Ok(Self(fut.await?)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{TokenService, UserRepository};
    use crate::domain::UserRole;
    use crate::outbound::jwt::JwtTokenService;
    use crate::test_support::{TEST_JWT_SECRET, TestHarness};
    use actix_web::http::StatusCode;
    use actix_web::http::header::HeaderValue;
    use actix_web::test as actix_test;
    use actix_web::{App, HttpResponse};
    use chrono::{Duration, Utc};
    use rstest::rstest;
    use zeroize::Zeroizing;

    #[rstest]
    #[case(Some("Bearer abc.def"), Some("abc.def"))]
    #[case(Some("bearer   abc "), Some("abc"))]
    #[case(Some("Basic dXNlcg=="), None)]
    #[case(Some("Bearer "), None)]
    #[case(None, None)]
    fn extracts_bearer_token(#[case] header: Option<&str>, #[case] expected: Option<&str>) {
        let mut headers = HeaderMap::new();
        if let Some(raw) = header {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(raw).expect("header"));
        }
        assert_eq!(bearer_token(&headers), expected);
    }

    /// Token for `user` issued `age` ago with a one hour lifetime.
    fn token_issued_ago(user: &User, age: Duration) -> String {
        let tokens = JwtTokenService::new(
            &Zeroizing::new(TEST_JWT_SECRET.to_owned()),
            Duration::hours(1),
        );
        tokens.issue(user, Utc::now() - age).expect("issue").token
    }

    async fn statuses_for(harness: &TestHarness, token: Option<String>) -> [StatusCode; 4] {
        let app = actix_test::init_service(
            App::new()
                .app_data(harness.state.clone())
                .route(
                    "/strict",
                    web::get().to(|_: AuthenticatedUser| async { HttpResponse::Ok().finish() }),
                )
                .route(
                    "/admin",
                    web::get().to(|_: AdminUser| async { HttpResponse::Ok().finish() }),
                )
                .route(
                    "/optional",
                    web::get().to(|user: OptionalUser| async move {
                        if user.as_ref().is_some() {
                            HttpResponse::Ok().finish()
                        } else {
                            HttpResponse::NoContent().finish()
                        }
                    }),
                )
                .route(
                    "/refresh",
                    web::get().to(|_: RefreshableUser| async { HttpResponse::Ok().finish() }),
                ),
        )
        .await;
        let mut statuses = [StatusCode::OK; 4];
        for (slot, path) in statuses
            .iter_mut()
            .zip(["/strict", "/admin", "/optional", "/refresh"])
        {
            let mut req = actix_test::TestRequest::get().uri(path);
            if let Some(token) = &token {
                req = req.insert_header((AUTHORIZATION, format!("Bearer {token}")));
            }
            *slot = actix_test::call_service(&app, req.to_request()).await.status();
        }
        statuses
    }

    #[actix_web::test]
    async fn anonymous_caller() {
        let harness = TestHarness::new();
        assert_eq!(
            statuses_for(&harness, None).await,
            [
                StatusCode::UNAUTHORIZED,
                StatusCode::UNAUTHORIZED,
                StatusCode::NO_CONTENT,
                StatusCode::UNAUTHORIZED,
            ]
        );
    }

    #[actix_web::test]
    async fn fresh_student_token() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let token = harness.token_for(&student);
        assert_eq!(
            statuses_for(&harness, Some(token)).await,
            [
                StatusCode::OK,
                StatusCode::FORBIDDEN,
                StatusCode::OK,
                StatusCode::OK,
            ]
        );
    }

    #[actix_web::test]
    async fn fresh_admin_token() {
        let harness = TestHarness::new();
        let admin = harness.seed_user(UserRole::Admin, "a@example.in").await;
        let token = harness.token_for(&admin);
        assert_eq!(statuses_for(&harness, Some(token)).await, [StatusCode::OK; 4]);
    }

    #[actix_web::test]
    async fn expired_token_within_grace_only_refreshes() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let token = token_issued_ago(&student, Duration::hours(3));
        assert_eq!(
            statuses_for(&harness, Some(token)).await,
            [
                StatusCode::UNAUTHORIZED,
                StatusCode::UNAUTHORIZED,
                StatusCode::NO_CONTENT,
                StatusCode::OK,
            ]
        );
    }

    #[actix_web::test]
    async fn token_past_grace_is_refused_everywhere() {
        let harness = TestHarness::new();
        let student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let token = token_issued_ago(&student, Duration::days(45));
        let statuses = statuses_for(&harness, Some(token)).await;
        assert_eq!(statuses[3], StatusCode::UNAUTHORIZED);
        assert_eq!(statuses[2], StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn deactivated_account_is_unauthorised() {
        let harness = TestHarness::new();
        let mut student = harness.seed_user(UserRole::Student, "s@example.in").await;
        let token = harness.token_for(&student);
        student.is_active = false;
        harness.users.update(&student).await.expect("update");
        let statuses = statuses_for(&harness, Some(token)).await;
        assert_eq!(statuses[0], StatusCode::UNAUTHORIZED);
        assert_eq!(statuses[2], StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn forged_token_is_unauthorised() {
        let harness = TestHarness::new();
        let statuses = statuses_for(&harness, Some("not.a.jwt".into())).await;
        assert_eq!(statuses[0], StatusCode::UNAUTHORIZED);
        assert_eq!(statuses[2], StatusCode::NO_CONTENT);
    }
}
