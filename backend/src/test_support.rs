//! Test utilities for the backend crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled when running tests
//! or when the `test-support` feature is enabled.
//!
//! [`TestHarness`] wires the full [`HttpState`] against the in-memory
//! repositories, a temporary upload directory, a recording mailer, and the
//! real JWT and argon2 adapters, so handler tests exercise the same code
//! paths as production minus the network.

use std::sync::{Arc, Mutex, PoisonError};

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header::{AUTHORIZATION, HeaderValue};
use actix_web::{App, web};
use async_trait::async_trait;
use chrono::Duration;
use mockable::{Clock, DefaultClock};
use zeroize::Zeroizing;

use crate::domain::ports::{
    EmailMessage, MailError, Mailer, PasswordHasher, PaymentGateway, TokenService, UserRepository,
};
use crate::domain::{
    Branch, Email, FileStorage, MaintenanceMode, Semester, StorageAddressing, User, UserId,
    UserRole,
};
use crate::inbound::http::state::{
    HttpState, HttpStateIntegrations, HttpStatePorts, HttpStateSettings,
};
use crate::outbound::argon2_hasher::Argon2PasswordHasher;
use crate::outbound::jwt::JwtTokenService;
use crate::outbound::memory::{
    MemoryAnnouncementRepository, MemoryAuditLogRepository, MemoryContactRepository,
    MemoryCourseRepository, MemoryInternshipRepository, MemoryMaterialRepository,
    MemoryNoticeRepository, MemoryNotificationRepository, MemoryPaymentRepository,
    MemoryProjectRepository, MemorySubjectRepository, MemorySubscriptionRepository,
    MemoryUserRepository,
};
use crate::outbound::realtime::NotificationHub;
use crate::outbound::storage::LocalBlobStore;

/// Secret used to sign tokens in tests.
pub const TEST_JWT_SECRET: &str = "digidiploma-test-secret";
/// Password given to seeded accounts.
pub const TEST_PASSWORD: &str = "correct-horse-42";

/// Mailer that keeps every message in memory.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}

/// Fully wired in-memory application state.
pub struct TestHarness {
    pub state: web::Data<HttpState>,
    pub users: Arc<MemoryUserRepository>,
    pub tokens: Arc<JwtTokenService>,
    pub hub: Arc<NotificationHub>,
    pub mailer: Arc<RecordingMailer>,
    pub maintenance: Arc<MaintenanceMode>,
    pub clock: Arc<dyn Clock>,
    hasher: Arc<Argon2PasswordHasher>,
    upload_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Harness without a payment gateway.
    ///
    /// # Panics
    /// Panics when the temporary upload directory cannot be created.
    pub fn new() -> Self {
        Self::build(None).expect("test harness")
    }

    /// Harness whose payment endpoints talk to `gateway`.
    ///
    /// # Panics
    /// Panics when the temporary upload directory cannot be created.
    pub fn with_payment_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::build(Some(gateway)).expect("test harness")
    }

    fn build(gateway: Option<Arc<dyn PaymentGateway>>) -> std::io::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let upload_dir = tempfile::tempdir()?;
        let local = Arc::new(LocalBlobStore::open(upload_dir.path())?);
        let storage = FileStorage::new(
            None,
            local,
            StorageAddressing {
                public_base_url: "http://localhost:5000".into(),
                ..StorageAddressing::default()
            },
            false,
            Arc::clone(&clock),
        );

        let users = Arc::new(MemoryUserRepository::default());
        let tokens = Arc::new(JwtTokenService::new(
            &Zeroizing::new(TEST_JWT_SECRET.to_owned()),
            Duration::hours(1),
        ));
        let hub = Arc::new(NotificationHub::default());
        let mailer = Arc::new(RecordingMailer::default());
        let hasher = Arc::new(Argon2PasswordHasher::default());
        let maintenance = Arc::new(MaintenanceMode::new(false));

        let ports = HttpStatePorts {
            users: Arc::clone(&users) as Arc<dyn UserRepository>,
            subjects: Arc::new(MemorySubjectRepository::default()),
            materials: Arc::new(MemoryMaterialRepository::default()),
            notices: Arc::new(MemoryNoticeRepository::default()),
            announcements: Arc::new(MemoryAnnouncementRepository::default()),
            notifications: Arc::new(MemoryNotificationRepository::default()),
            payments: Arc::new(MemoryPaymentRepository::default()),
            subscriptions: Arc::new(MemorySubscriptionRepository::default()),
            courses: Arc::new(MemoryCourseRepository::default()),
            projects: Arc::new(MemoryProjectRepository::default()),
            internships: Arc::new(MemoryInternshipRepository::default()),
            contacts: Arc::new(MemoryContactRepository::default()),
            audit_logs: Arc::new(MemoryAuditLogRepository::default()),
        };
        let integrations = HttpStateIntegrations {
            hasher: Arc::clone(&hasher) as Arc<dyn PasswordHasher>,
            tokens: Arc::clone(&tokens) as Arc<dyn TokenService>,
            mailer: Arc::clone(&mailer) as Arc<dyn Mailer>,
            payment_gateway: gateway,
            push: None,
            broadcaster: Arc::clone(&hub) as _,
            storage,
        };
        let settings = HttpStateSettings {
            maintenance: Arc::clone(&maintenance),
            refresh_grace: Duration::days(30),
            reset_url: "http://localhost:5173/reset-password".into(),
            admin_email: Email::new("admin@digidiploma.in").ok(),
        };
        let state = web::Data::new(HttpState::new(
            ports,
            integrations,
            settings,
            Arc::clone(&clock),
        ));

        Ok(Self {
            state,
            users,
            tokens,
            hub,
            mailer,
            maintenance,
            clock,
            hasher,
            upload_dir,
        })
    }

    /// Application serving every `/api` route against this harness.
    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Response = ServiceResponse,
            Config = (),
            InitError = (),
            Error = actix_web::Error,
        > + use<>,
    > {
        App::new()
            .app_data(self.state.clone())
            .configure(crate::inbound::http::routes::configure)
    }

    /// Directory backing local uploads.
    pub fn upload_dir(&self) -> &std::path::Path {
        self.upload_dir.path()
    }

    /// Insert an active account with [`TEST_PASSWORD`].
    ///
    /// # Panics
    /// Panics when hashing or inserting fails.
    pub async fn seed_user(&self, role: UserRole, email: &str) -> User {
        let now = self.clock.utc();
        let user = User {
            id: UserId::random(),
            name: "Test Learner".into(),
            email: Email::new(email).expect("fixture email"),
            password_hash: self.hasher.hash(TEST_PASSWORD).expect("hash"),
            role,
            branch: Some(Branch::new("Computer Engineering").expect("branch")),
            semester: Some(Semester::new(3).expect("semester")),
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
        self.users.insert(&user).await.expect("insert user");
        user
    }

    /// Signed bearer token for `user`.
    ///
    /// # Panics
    /// Panics when signing fails.
    pub fn token_for(&self, user: &User) -> String {
        self.tokens
            .issue(user, self.clock.utc())
            .expect("issue token")
            .token
    }

    /// `Authorization` header for `user`.
    ///
    /// # Panics
    /// Panics when signing fails.
    pub fn bearer(&self, user: &User) -> (actix_web::http::header::HeaderName, HeaderValue) {
        let value = HeaderValue::from_str(&format!("Bearer {}", self.token_for(user)))
            .expect("ascii header");
        (AUTHORIZATION, value)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// File part for [`MultipartBody`].
pub struct MultipartFile<'a> {
    field: &'a str,
    file_name: &'a str,
    content_type: &'a str,
    bytes: &'a [u8],
}

impl<'a> MultipartFile<'a> {
    pub fn new(field: &'a str, file_name: &'a str, content_type: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            field,
            file_name,
            content_type,
            bytes,
        }
    }
}

/// Hand-assembled `multipart/form-data` body for upload tests.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    const BOUNDARY: &'static str = "digidiploma-test-boundary";

    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text part.
    #[must_use]
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                Self::BOUNDARY
            )
            .as_bytes(),
        );
        self
    }

    /// Append a file part.
    #[must_use]
    pub fn file(mut self, file: MultipartFile<'_>) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                Self::BOUNDARY,
                file.field,
                file.file_name,
                file.content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(file.bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Close the body and attach it to `req`.
    pub fn attach(mut self, req: actix_web::test::TestRequest) -> actix_web::test::TestRequest {
        self.body
            .extend_from_slice(format!("--{}--\r\n", Self::BOUNDARY).as_bytes());
        req.insert_header((
            actix_web::http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", Self::BOUNDARY),
        ))
        .set_payload(self.body)
    }
}
