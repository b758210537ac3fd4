//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable without I/O. The state is
//! assembled from two parameter objects: [`HttpStatePorts`] (persistence) and
//! [`HttpStateIntegrations`] (hashing, tokens, mail, payments, push, realtime,
//! file storage).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mockable::Clock;

use crate::domain::ports::{
    AnnouncementRepository, AuditLogRepository, ContactRepository, CourseRepository,
    InternshipRepository, Mailer, MaterialRepository, NoticeRepository, NotificationBroadcaster,
    NotificationRepository, PasswordHasher, PaymentGateway, PaymentRepository, ProjectRepository,
    PushNotifier, SubjectRepository, SubscriptionRepository, TokenService, UserRepository,
};
use crate::domain::{
    AccountService, AnalyticsPorts, AnalyticsService, AuditRecorder, ContactService,
    CourseService, Email, FileStorage, InternshipService, MaintenanceMode, MaintenanceService,
    MaterialPorts, MaterialService, NoticeService, NotificationService, PaymentPorts,
    PaymentService, ProjectService, SubjectService, SubscriptionService,
};

/// Parameter object bundling every repository port.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub users: Arc<dyn UserRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
    pub materials: Arc<dyn MaterialRepository>,
    pub notices: Arc<dyn NoticeRepository>,
    pub announcements: Arc<dyn AnnouncementRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub internships: Arc<dyn InternshipRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub audit_logs: Arc<dyn AuditLogRepository>,
}

/// Parameter object bundling the non-persistence collaborators.
///
/// Optional integrations are `None` when their credentials are absent; the
/// services answer `503` (payments) or skip the side effect (push).
#[derive(Clone)]
pub struct HttpStateIntegrations {
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenService>,
    pub mailer: Arc<dyn Mailer>,
    pub payment_gateway: Option<Arc<dyn PaymentGateway>>,
    pub push: Option<Arc<dyn PushNotifier>>,
    pub broadcaster: Arc<dyn NotificationBroadcaster>,
    pub storage: FileStorage,
}

/// Tunables that are not ports.
#[derive(Clone)]
pub struct HttpStateSettings {
    /// Shared switch also read by the maintenance gate middleware.
    pub maintenance: Arc<MaintenanceMode>,
    /// How long after expiry a token may still be refreshed.
    pub refresh_grace: Duration,
    /// Frontend page that receives `?token=` for password resets.
    pub reset_url: String,
    /// Recipient of contact-form notifications.
    pub admin_email: Option<Email>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: AccountService,
    pub subjects: SubjectService,
    pub materials: MaterialService,
    pub notices: NoticeService,
    pub payments: PaymentService,
    pub subscriptions: SubscriptionService,
    pub projects: ProjectService,
    pub internships: InternshipService,
    pub courses: CourseService,
    pub contact: ContactService,
    pub analytics: AnalyticsService,
    pub maintenance: MaintenanceService,
    pub notifications: NotificationService,
    pub refresh_grace: Duration,
    clock: Arc<dyn Clock>,
}

impl HttpState {
    /// Wire every domain service from its ports.
    pub fn new(
        ports: HttpStatePorts,
        integrations: HttpStateIntegrations,
        settings: HttpStateSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let HttpStatePorts {
            users,
            subjects,
            materials,
            notices,
            announcements,
            notifications,
            payments,
            subscriptions,
            courses,
            projects,
            internships,
            contacts,
            audit_logs,
        } = ports;
        let HttpStateIntegrations {
            hasher,
            tokens,
            mailer,
            payment_gateway,
            push,
            broadcaster,
            storage,
        } = integrations;
        let HttpStateSettings {
            maintenance,
            refresh_grace,
            reset_url,
            admin_email,
        } = settings;

        let audit = AuditRecorder::new(audit_logs, Arc::clone(&clock));
        let notification_service = NotificationService::new(
            notifications,
            Arc::clone(&users),
            broadcaster,
            push,
            Arc::clone(&clock),
        );
        let notice_service = NoticeService::new(
            Arc::clone(&notices),
            announcements,
            storage.clone(),
            notification_service.clone(),
            audit.clone(),
            Arc::clone(&clock),
        );

        Self {
            accounts: AccountService::new(
                Arc::clone(&users),
                hasher,
                tokens,
                Arc::clone(&mailer),
                storage.clone(),
                audit.clone(),
                Arc::clone(&clock),
                reset_url,
            ),
            subjects: SubjectService::new(Arc::clone(&subjects), audit.clone(), Arc::clone(&clock)),
            materials: MaterialService::new(
                MaterialPorts {
                    materials: Arc::clone(&materials),
                    subjects: Arc::clone(&subjects),
                    payments: Arc::clone(&payments),
                    subscriptions: Arc::clone(&subscriptions),
                },
                storage.clone(),
                notification_service.clone(),
                audit.clone(),
                Arc::clone(&clock),
            ),
            payments: PaymentService::new(
                PaymentPorts {
                    payments: Arc::clone(&payments),
                    subscriptions: Arc::clone(&subscriptions),
                    materials: Arc::clone(&materials),
                    courses: Arc::clone(&courses),
                    users: Arc::clone(&users),
                    mailer: Arc::clone(&mailer),
                },
                payment_gateway,
                notification_service.clone(),
                audit.clone(),
                Arc::clone(&clock),
            ),
            subscriptions: SubscriptionService::new(
                Arc::clone(&subscriptions),
                audit.clone(),
                Arc::clone(&clock),
            ),
            projects: ProjectService::new(
                projects,
                storage.clone(),
                notification_service.clone(),
                audit.clone(),
                Arc::clone(&clock),
            ),
            internships: InternshipService::new(
                internships,
                storage,
                notification_service.clone(),
                audit.clone(),
                Arc::clone(&clock),
            ),
            courses: CourseService::new(
                courses,
                Arc::clone(&payments),
                audit.clone(),
                Arc::clone(&clock),
            ),
            contact: ContactService::new(contacts, mailer, admin_email, Arc::clone(&clock)),
            analytics: AnalyticsService::new(
                AnalyticsPorts {
                    users,
                    subjects,
                    materials,
                    notices,
                    subscriptions,
                    payments,
                },
                notice_service.clone(),
                notification_service.clone(),
                audit.clone(),
                Arc::clone(&clock),
            ),
            maintenance: MaintenanceService::new(maintenance, audit, Arc::clone(&clock)),
            notices: notice_service,
            notifications: notification_service,
            refresh_grace,
            clock,
        }
    }

    /// Current time on the clock shared with the services.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }
}
