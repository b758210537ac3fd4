//! Domain primitives, ports, and use-case services.
//!
//! Purpose: Define strongly typed entities for the DigiDiploma platform and
//! the services that drive them. Nothing here knows about HTTP or MongoDB;
//! adapters reach the domain through the traits in [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`) - API error response payload.
//! - Entities: users, subjects, materials, notices, payments, subscriptions,
//!   projects, internships, courses, contact messages, notifications.
//! - Services: one concrete struct per use-case area, cloned into handlers.

pub mod academic;
pub mod account_service;
pub mod analytics;
pub mod analytics_service;
pub mod audit;
pub mod audit_recorder;
pub mod auth;
pub mod contact;
pub mod contact_service;
pub mod course;
pub mod course_service;
pub mod email_templates;
pub mod error;
pub mod file_storage;
pub mod ids;
pub mod internship;
pub mod internship_service;
pub mod maintenance;
pub mod maintenance_service;
pub mod material;
pub mod material_service;
pub mod notice;
pub mod notice_service;
pub mod notification;
pub mod notification_service;
pub mod payment;
pub mod payment_service;
pub mod ports;
pub mod project;
pub mod project_service;
pub mod storage;
pub mod subject;
pub mod subject_service;
pub mod subscription;
pub mod subscription_service;
pub mod trace_id;
pub mod user;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use self::academic::{AcademicValidationError, Branch, SEMESTER_MAX, SEMESTER_MIN, Semester};
pub use self::account_service::{AccountService, AuthSession, RESET_TOKEN_TTL_MINUTES};
pub use self::analytics::{AnalyticsOverview, StudentDashboard, TopMaterial};
pub use self::analytics_service::{AnalyticsPorts, AnalyticsService};
pub use self::audit::{AuditAction, AuditEntry, AuditLog};
pub use self::audit_recorder::AuditRecorder;
pub use self::auth::{
    ExpiryPolicy, IssuedToken, LoginCredentials, LoginValidationError, NewPassword,
    PASSWORD_MAX, PASSWORD_MIN, Registration, TokenClaims,
};
pub use self::contact::{
    CONTACT_MESSAGE_MAX, ContactDraft, ContactMessage, ContactStatus, ContactValidationError,
};
pub use self::contact_service::ContactService;
pub use self::course::{Course, CourseDraft, CourseValidationError};
pub use self::course_service::CourseService;
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::file_storage::{FileStorage, FileUpload};
pub use self::ids::{
    AnnouncementId, AuditLogId, ContactMessageId, CourseId, IdValidationError,
    InternshipApplicationId, MaterialId, NoticeId, NotificationId, PaymentOrderId, ProjectId,
    SubjectId, SubscriptionId, UserId,
};
pub use self::internship::{InternshipApplication, InternshipDraft, InternshipStatus};
pub use self::internship_service::InternshipService;
pub use self::maintenance::{
    DEFAULT_MAINTENANCE_MESSAGE, MaintenanceMode, MaintenanceStatus, is_maintenance_exempt,
};
pub use self::maintenance_service::MaintenanceService;
pub use self::material::{
    AccessDecision, AccessType, Entitlements, Material, MaterialDraft, MaterialFilter,
    MaterialKind, MaterialValidationError,
};
pub use self::material_service::{MaterialPorts, MaterialService, MaterialView};
pub use self::notice::{
    Announcement, Audience, Notice, NoticeDraft, NoticePriority, NoticeValidationError,
    sort_for_board,
};
pub use self::notice_service::{AnnouncementDraft, NoticeService};
pub use self::notification::{
    Notification, NotificationDraft, NotificationEvent, NotificationKind,
};
pub use self::notification_service::{INBOX_LIMIT, InboxItem, NotificationService};
pub use self::payment::{
    CURRENCY, CheckoutConfirmation, PaymentEvent, PaymentOrder, PaymentPurpose, PaymentStatus,
};
pub use self::payment_service::{PaymentConfig, PaymentPorts, PaymentService, PlanOffer};
pub use self::project::{
    ProjectDraft, ProjectReview, ProjectStatus, ProjectSubmission, split_list,
};
pub use self::project_service::ProjectService;
pub use self::storage::{
    ObjectKey, ObjectKeyError, PROXY_PATH, StorageAddressing, StorageBackend, StorageLocation,
    StoredFile, UPLOADS_PATH, sanitise_file_name,
};
pub use self::subject::{
    SUBJECT_CODE_MAX, Subject, SubjectCode, SubjectDraft, SubjectFilter, SubjectValidationError,
};
pub use self::subject_service::SubjectService;
pub use self::subscription::{
    Subscription, SubscriptionCoverage, SubscriptionPlan, SubscriptionStatus,
};
pub use self::subscription_service::{SubscriptionService, SubscriptionView};
pub use self::trace_id::TraceId;
pub use self::user::{
    CurrentUser, Email, NAME_MAX, NAME_MIN, PasswordHash, PasswordReset, ProfileUpdate, User,
    UserFilter, UserRole, UserValidationError,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use digidiploma::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
