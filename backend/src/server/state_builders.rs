//! Builders turning [`AppConfig`] into the adapter graph behind the handlers.
//!
//! MongoDB repositories are used when `MONGODB_URI` is set; otherwise every
//! port falls back to the in-memory adapters so the server can run without
//! a database during local development.

use std::io;
use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use digidiploma::domain::ports::{
    BlobStore, Mailer, NotificationFeed, PasswordHasher, PaymentGateway, PushNotifier,
    TokenService,
};
use digidiploma::domain::{FileStorage, MaintenanceMode, StorageAddressing};
use digidiploma::inbound::http::state::{
    HttpState, HttpStateIntegrations, HttpStatePorts, HttpStateSettings,
};
use digidiploma::inbound::ws::state::WsState;
use digidiploma::outbound::argon2_hasher::Argon2PasswordHasher;
use digidiploma::outbound::email::{FallbackMailer, NoopMailer, SendGridMailer, SmtpMailer};
use digidiploma::outbound::fcm::FcmPushNotifier;
use digidiploma::outbound::jwt::JwtTokenService;
use digidiploma::outbound::memory::{
    MemoryAnnouncementRepository, MemoryAuditLogRepository, MemoryContactRepository,
    MemoryCourseRepository, MemoryInternshipRepository, MemoryMaterialRepository,
    MemoryNoticeRepository, MemoryNotificationRepository, MemoryPaymentRepository,
    MemoryProjectRepository, MemorySubjectRepository, MemorySubscriptionRepository,
    MemoryUserRepository,
};
use digidiploma::outbound::mongo::{
    MongoAnnouncementRepository, MongoAuditLogRepository, MongoContactRepository,
    MongoCourseRepository, MongoDatabase, MongoInternshipRepository, MongoMaterialRepository,
    MongoNoticeRepository, MongoNotificationRepository, MongoPaymentRepository,
    MongoProjectRepository, MongoSubjectRepository, MongoSubscriptionRepository,
    MongoUserRepository,
};
use digidiploma::outbound::razorpay::RazorpayGateway;
use digidiploma::outbound::realtime::NotificationHub;
use digidiploma::outbound::storage::{LocalBlobStore, R2BlobStore};

use super::AppConfig;

/// Everything the app factory and middleware need, cloned into each worker.
#[derive(Clone)]
pub(crate) struct ServerState {
    pub(crate) http: web::Data<HttpState>,
    pub(crate) ws: web::Data<WsState>,
    pub(crate) tokens: Arc<dyn TokenService>,
    pub(crate) maintenance: Arc<MaintenanceMode>,
    pub(crate) clock: Arc<dyn Clock>,
}

/// Connect to MongoDB when configured and create its indexes.
///
/// # Errors
/// Returns an I/O error wrapping the driver failure.
pub(crate) async fn connect_database(config: &AppConfig) -> io::Result<Option<MongoDatabase>> {
    let Some(mongo) = &config.mongo else {
        warn!("MONGODB_URI not set; using in-memory repositories");
        return Ok(None);
    };
    let db = MongoDatabase::connect(mongo)
        .await
        .map_err(|err| io::Error::other(format!("MongoDB connection failed: {err}")))?;
    db.ensure_indexes()
        .await
        .map_err(|err| io::Error::other(format!("MongoDB index creation failed: {err}")))?;
    Ok(Some(db))
}

pub(crate) fn build_ports(db: Option<&MongoDatabase>) -> HttpStatePorts {
    match db {
        Some(db) => HttpStatePorts {
            users: Arc::new(MongoUserRepository::new(db)),
            subjects: Arc::new(MongoSubjectRepository::new(db)),
            materials: Arc::new(MongoMaterialRepository::new(db)),
            notices: Arc::new(MongoNoticeRepository::new(db)),
            announcements: Arc::new(MongoAnnouncementRepository::new(db)),
            notifications: Arc::new(MongoNotificationRepository::new(db)),
            payments: Arc::new(MongoPaymentRepository::new(db)),
            subscriptions: Arc::new(MongoSubscriptionRepository::new(db)),
            courses: Arc::new(MongoCourseRepository::new(db)),
            projects: Arc::new(MongoProjectRepository::new(db)),
            internships: Arc::new(MongoInternshipRepository::new(db)),
            contacts: Arc::new(MongoContactRepository::new(db)),
            audit_logs: Arc::new(MongoAuditLogRepository::new(db)),
        },
        None => HttpStatePorts {
            users: Arc::new(MemoryUserRepository::default()),
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
        },
    }
}

/// Open the upload directory and, when configured, the R2 bucket.
///
/// # Errors
/// Returns an I/O error when the upload directory cannot be created.
pub(crate) fn build_storage(config: &AppConfig, clock: Arc<dyn Clock>) -> io::Result<FileStorage> {
    let storage = &config.storage;
    let local = Arc::new(LocalBlobStore::open(&storage.upload_dir)?);
    let remote = match &storage.r2 {
        Some(r2) => match R2BlobStore::new(r2) {
            Ok(store) => {
                info!(bucket = %r2.bucket, "R2 storage enabled");
                Some(Arc::new(store) as Arc<dyn BlobStore>)
            }
            Err(err) if storage.force_r2 => {
                return Err(io::Error::other(format!("R2 client failed: {err}")));
            }
            Err(err) => {
                warn!(error = %err, "R2 client failed; storing uploads on local disk");
                None
            }
        },
        None => None,
    };
    let addressing = StorageAddressing {
        public_base_url: config.public_base_url.clone(),
        r2_public_url: storage.r2_public_url.clone(),
        r2_account_id: storage.r2.as_ref().map(|r2| r2.account_id.clone()),
        r2_bucket: storage.r2.as_ref().map(|r2| r2.bucket.clone()),
    };
    Ok(FileStorage::new(
        remote,
        local,
        addressing,
        storage.force_r2,
        clock,
    ))
}

/// SendGrid first, SMTP second; a logging no-op when neither is configured.
pub(crate) fn build_mailer(config: &AppConfig) -> Arc<dyn Mailer> {
    let email = &config.email;
    let mut transports: Vec<(&'static str, Arc<dyn Mailer>)> = Vec::new();

    if let Some(api_key) = &email.sendgrid_api_key {
        match SendGridMailer::new(api_key.as_str(), email.from.clone(), email.from_name.as_str()) {
            Ok(mailer) => transports.push(("sendgrid", Arc::new(mailer))),
            Err(err) => warn!(error = %err, "SendGrid client failed; skipping transport"),
        }
    }
    if let Some(smtp) = &email.smtp {
        match SmtpMailer::new(smtp, &email.from, &email.from_name) {
            Ok(mailer) => transports.push(("smtp", Arc::new(mailer))),
            Err(err) => warn!(error = %err, host = %smtp.host, "SMTP relay rejected; skipping transport"),
        }
    }

    if transports.is_empty() {
        Arc::new(NoopMailer)
    } else {
        Arc::new(FallbackMailer::new(transports))
    }
}

fn build_payment_gateway(config: &AppConfig) -> io::Result<Option<Arc<dyn PaymentGateway>>> {
    config
        .razorpay
        .clone()
        .map(|razorpay| {
            RazorpayGateway::new(razorpay)
                .map(|gateway| Arc::new(gateway) as Arc<dyn PaymentGateway>)
                .map_err(|err| io::Error::other(format!("Razorpay client failed: {err}")))
        })
        .transpose()
}

fn build_push(config: &AppConfig, clock: Arc<dyn Clock>) -> Option<Arc<dyn PushNotifier>> {
    let fcm = config.fcm.clone()?;
    match FcmPushNotifier::new(fcm, clock) {
        Ok(push) => Some(Arc::new(push)),
        Err(err) => {
            warn!(error = %err, "Firebase credentials rejected; push notifications are disabled");
            None
        }
    }
}

/// Wire every adapter and service.
///
/// # Errors
/// Returns an I/O error when the database, storage, or payment client cannot
/// be initialised.
pub(crate) async fn build_server_state(config: &AppConfig) -> io::Result<ServerState> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let db = connect_database(config).await?;

    let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(
        &config.jwt_secret,
        config.token_lifetime,
    ));
    let hub = Arc::new(NotificationHub::default());
    let maintenance = Arc::new(MaintenanceMode::new(config.maintenance));
    if config.maintenance {
        warn!("starting in maintenance mode");
    }

    let integrations = HttpStateIntegrations {
        hasher: Arc::new(Argon2PasswordHasher::default()) as Arc<dyn PasswordHasher>,
        tokens: Arc::clone(&tokens),
        mailer: build_mailer(config),
        payment_gateway: build_payment_gateway(config)?,
        push: build_push(config, Arc::clone(&clock)),
        broadcaster: Arc::clone(&hub) as _,
        storage: build_storage(config, Arc::clone(&clock))?,
    };
    let settings = HttpStateSettings {
        maintenance: Arc::clone(&maintenance),
        refresh_grace: config.refresh_grace,
        reset_url: config.reset_url(),
        admin_email: config.admin_email.clone(),
    };
    let http = HttpState::new(
        build_ports(db.as_ref()),
        integrations,
        settings,
        Arc::clone(&clock),
    );
    let ws = WsState::new(
        http.accounts.clone(),
        hub as Arc<dyn NotificationFeed>,
        config.cors_origins.clone(),
    );

    Ok(ServerState {
        http: web::Data::new(http),
        ws: web::Data::new(ws),
        tokens,
        maintenance,
        clock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::BuildMode;
    use mockable::MockEnv;
    use rstest::rstest;

    fn config(upload_dir: &std::path::Path) -> AppConfig {
        let upload_dir = upload_dir.to_string_lossy().into_owned();
        let mut env = MockEnv::new();
        env.expect_string().times(0..).returning(move |key| match key {
            "UPLOAD_DIR" => Some(upload_dir.clone()),
            _ => None,
        });
        AppConfig::from_env(&env, BuildMode::Debug).expect("config")
    }

    #[rstest]
    #[tokio::test]
    async fn builds_in_memory_state_without_integrations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config(&dir.path().join("uploads"));

        let state = build_server_state(&config).await.expect("server state");

        assert!(dir.path().join("uploads").is_dir());
        assert!(!state.maintenance.is_enabled());
        assert!(!state.http.payments.config().enabled);
    }

    #[rstest]
    fn local_storage_is_used_without_r2() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config(dir.path());
        let storage = build_storage(&config, Arc::new(DefaultClock)).expect("storage");
        assert!(!storage.remote_enabled());
    }
}
