//! Tests for the account service.

use std::sync::Arc;

use chrono::Duration;
use rstest::rstest;

use super::*;
use crate::domain::ports::{
    MockAuditLogRepository, MockBlobStore, MockMailer, MockPasswordHasher, MockTokenService,
    MockUserRepository, RepositoryError,
};
use crate::domain::test_fixtures::{current, fixture_clock, fixture_timestamp, user};
use crate::domain::{Branch, ErrorCode, Semester, StorageAddressing, TokenClaims};

struct Mocks {
    users: MockUserRepository,
    hasher: MockPasswordHasher,
    tokens: MockTokenService,
    mailer: MockMailer,
}

impl Mocks {
    fn new() -> Self {
        let mut tokens = MockTokenService::new();
        tokens.expect_issue().returning(|_, now| {
            Ok(IssuedToken {
                token: "signed.jwt.token".into(),
                expires_at: now + Duration::days(7),
            })
        });
        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash()
            .returning(|pw| Ok(PasswordHash::new(format!("hashed:{pw}"))));
        hasher
            .expect_verify()
            .returning(|pw, hash| Ok(hash.as_str() == format!("hashed:{pw}")));
        let mut mailer = MockMailer::new();
        mailer.expect_send().returning(|_| Ok(()));
        Self {
            users: MockUserRepository::new(),
            hasher,
            tokens,
            mailer,
        }
    }

    fn into_service(self) -> AccountService {
        let clock = fixture_clock();
        let mut audit_repo = MockAuditLogRepository::new();
        audit_repo.expect_insert().returning(|_| Ok(()));
        let storage = FileStorage::new(
            None,
            Arc::new(MockBlobStore::new()),
            StorageAddressing::default(),
            false,
            clock.clone(),
        );
        AccountService::new(
            Arc::new(self.users),
            Arc::new(self.hasher),
            Arc::new(self.tokens),
            Arc::new(self.mailer),
            storage,
            AuditRecorder::new(Arc::new(audit_repo), clock.clone()),
            clock,
            "https://digidiploma.test/reset-password",
        )
    }
}

fn registration() -> Registration {
    Registration {
        name: "Asha Patil".into(),
        email: Email::new("asha@example.in").expect("email"),
        password: NewPassword::new("s3cret-pass").expect("password"),
        branch: Branch::new("Computer Engineering").expect("branch"),
        semester: Semester::new(3).expect("semester"),
        phone: None,
        college: None,
        enrollment_number: None,
    }
}

fn hashed(mut account: User, password: &str) -> User {
    account.password_hash = PasswordHash::new(format!("hashed:{password}"));
    account
}

#[rstest]
#[tokio::test]
async fn register_creates_a_student_and_issues_a_token() {
    let mut mocks = Mocks::new();
    mocks.users.expect_find_by_email().returning(|_| Ok(None));
    mocks
        .users
        .expect_insert()
        .withf(|u| u.role == UserRole::Student && u.password_hash.as_str() == "hashed:s3cret-pass")
        .times(1)
        .returning(|_| Ok(()));

    let session = mocks
        .into_service()
        .register(registration(), None)
        .await
        .expect("registration succeeds");

    assert_eq!(session.user.email.as_ref(), "asha@example.in");
    assert_eq!(session.token.token, "signed.jwt.token");
}

#[rstest]
#[case::found_on_lookup(true)]
#[case::raced_on_insert(false)]
#[tokio::test]
async fn register_rejects_duplicate_email(#[case] found_on_lookup: bool) {
    let mut mocks = Mocks::new();
    mocks.users.expect_find_by_email().returning(move |_| {
        Ok(found_on_lookup.then(|| user(UserRole::Student)))
    });
    mocks
        .users
        .expect_insert()
        .returning(|_| Err(RepositoryError::duplicate("email")));

    let err = mocks
        .into_service()
        .register(registration(), None)
        .await
        .expect_err("duplicate email");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[case::wrong_password("nope", true, ErrorCode::Unauthorized)]
#[case::inactive("right-pass", false, ErrorCode::Unauthorized)]
#[tokio::test]
async fn login_rejects_bad_accounts(
    #[case] password: &str,
    #[case] active: bool,
    #[case] expected: ErrorCode,
) {
    let mut mocks = Mocks::new();
    mocks.users.expect_find_by_email().returning(move |_| {
        let mut account = hashed(user(UserRole::Student), "right-pass");
        account.is_active = active;
        Ok(Some(account))
    });
    mocks.users.expect_update().times(0);
    let credentials = LoginCredentials::try_from_parts("asha@example.in", password).expect("shape");

    let err = mocks
        .into_service()
        .login(&credentials, None)
        .await
        .expect_err("login fails");

    assert_eq!(err.code(), expected);
}

#[rstest]
#[tokio::test]
async fn login_records_last_login() {
    let mut mocks = Mocks::new();
    mocks
        .users
        .expect_find_by_email()
        .returning(|_| Ok(Some(hashed(user(UserRole::Student), "right-pass"))));
    mocks
        .users
        .expect_update()
        .withf(|u| u.last_login_at == Some(fixture_timestamp()))
        .times(1)
        .returning(|_| Ok(()));
    let credentials =
        LoginCredentials::try_from_parts("asha@example.in", "right-pass").expect("shape");

    let session = mocks
        .into_service()
        .login(&credentials, Some("10.0.0.1".into()))
        .await
        .expect("login succeeds");
    assert_eq!(session.user.last_login_at, Some(fixture_timestamp()));
}

#[rstest]
#[tokio::test]
async fn authenticate_rejects_inactive_users() {
    let account = user(UserRole::Student);
    let sub = account.id.to_string();
    let mut mocks = Mocks::new();
    mocks.tokens.expect_decode().returning(move |_, _, now| {
        Ok(TokenClaims {
            sub: sub.clone(),
            email: "asha@example.in".into(),
            role: UserRole::Student,
            iat: now.timestamp(),
            exp: now.timestamp() + 60,
        })
    });
    mocks.users.expect_find_by_id().returning(move |_| {
        let mut inactive = account.clone();
        inactive.is_active = false;
        Ok(Some(inactive))
    });

    let err = mocks
        .into_service()
        .authenticate("token", ExpiryPolicy::Strict)
        .await
        .expect_err("inactive");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn forgot_password_stores_hash_not_token() {
    let mut mocks = Mocks::new();
    mocks
        .users
        .expect_find_by_email()
        .returning(|_| Ok(Some(user(UserRole::Student))));
    mocks
        .users
        .expect_update()
        .withf(|u| {
            u.password_reset.as_ref().is_some_and(|reset| {
                reset.token_hash.len() == 64
                    && reset.expires_at == fixture_timestamp() + Duration::minutes(60)
            })
        })
        .times(1)
        .returning(|_| Ok(()));

    mocks
        .into_service()
        .forgot_password(&Email::new("asha@example.in").expect("email"))
        .await
        .expect("request accepted");
}

#[rstest]
#[tokio::test]
async fn forgot_password_is_silent_for_unknown_emails() {
    let mut mocks = Mocks::new();
    mocks.users.expect_find_by_email().returning(|_| Ok(None));
    mocks.users.expect_update().times(0);

    mocks
        .into_service()
        .forgot_password(&Email::new("ghost@example.in").expect("email"))
        .await
        .expect("still succeeds");
}

#[rstest]
#[case::expired(-1, ErrorCode::InvalidRequest)]
#[tokio::test]
async fn reset_password_rejects_expired_tokens(#[case] minutes: i64, #[case] expected: ErrorCode) {
    let mut mocks = Mocks::new();
    mocks
        .users
        .expect_find_by_reset_token_hash()
        .withf(|hash| hash == hash_reset_token("tok").as_str())
        .returning(move |hash| {
            let mut account = user(UserRole::Student);
            account.password_reset = Some(PasswordReset {
                token_hash: hash.to_owned(),
                expires_at: fixture_timestamp() + Duration::minutes(minutes),
            });
            Ok(Some(account))
        });
    mocks.users.expect_update().times(0);

    let err = mocks
        .into_service()
        .reset_password("tok", &NewPassword::new("another-pass").expect("password"))
        .await
        .expect_err("expired");
    assert_eq!(err.code(), expected);
}

#[rstest]
#[tokio::test]
async fn reset_password_clears_the_token() {
    let mut mocks = Mocks::new();
    mocks
        .users
        .expect_find_by_reset_token_hash()
        .returning(|hash| {
            let mut account = user(UserRole::Student);
            account.password_reset = Some(PasswordReset {
                token_hash: hash.to_owned(),
                expires_at: fixture_timestamp() + Duration::minutes(30),
            });
            Ok(Some(account))
        });
    mocks
        .users
        .expect_update()
        .withf(|u| u.password_reset.is_none() && u.password_hash.as_str() == "hashed:another-pass")
        .times(1)
        .returning(|_| Ok(()));

    mocks
        .into_service()
        .reset_password("tok", &NewPassword::new("another-pass").expect("password"))
        .await
        .expect("reset succeeds");
}

#[rstest]
#[tokio::test]
async fn admins_cannot_deactivate_themselves() {
    let admin = current(UserRole::Admin);
    let mut mocks = Mocks::new();
    mocks.users.expect_update().times(0);

    let err = mocks
        .into_service()
        .set_active(&admin, &admin.id.clone(), false)
        .await
        .expect_err("self change rejected");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn ensure_admin_creates_missing_account() {
    let mut mocks = Mocks::new();
    mocks.users.expect_find_by_email().returning(|_| Ok(None));
    mocks
        .users
        .expect_insert()
        .withf(|u| u.role == UserRole::Admin && u.is_active && u.branch.is_none())
        .times(1)
        .returning(|_| Ok(()));

    let (admin, created) = mocks
        .into_service()
        .ensure_admin(
            " Site Admin ",
            Email::new("admin@digidiploma.in").expect("email"),
            &NewPassword::new("admin-pass-1").expect("password"),
        )
        .await
        .expect("admin created");

    assert!(created);
    assert_eq!(admin.name, "Site Admin");
    assert_eq!(admin.password_hash.as_str(), "hashed:admin-pass-1");
}

#[rstest]
#[tokio::test]
async fn ensure_admin_promotes_existing_account() {
    let mut mocks = Mocks::new();
    mocks.users.expect_find_by_email().returning(|_| {
        let mut account = user(UserRole::Student);
        account.is_active = false;
        Ok(Some(account))
    });
    mocks.users.expect_insert().times(0);
    mocks
        .users
        .expect_update()
        .withf(|u| {
            u.role == UserRole::Admin && u.is_active && u.password_hash.as_str() == "hashed:admin-pass-1"
        })
        .times(1)
        .returning(|_| Ok(()));

    let (_, created) = mocks
        .into_service()
        .ensure_admin(
            "Site Admin",
            Email::new("student@example.in").expect("email"),
            &NewPassword::new("admin-pass-1").expect("password"),
        )
        .await
        .expect("admin promoted");

    assert!(!created);
}

#[rstest]
#[tokio::test]
async fn ensure_admin_rejects_short_names() {
    let mut mocks = Mocks::new();
    mocks.users.expect_insert().times(0);

    let err = mocks
        .into_service()
        .ensure_admin(
            "A",
            Email::new("admin@digidiploma.in").expect("email"),
            &NewPassword::new("admin-pass-1").expect("password"),
        )
        .await
        .expect_err("name rejected");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}
