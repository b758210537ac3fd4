//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Persistence ports share [`RepositoryError`]; integration ports each carry
//! their own error enum generated by `define_port_error!`.

mod macros;
pub(crate) use macros::define_port_error;

mod audit_log_repository;
mod blob_store;
mod contact_repository;
mod course_repository;
mod internship_repository;
mod mailer;
mod material_repository;
mod notice_repository;
mod notification_broadcaster;
mod notification_repository;
mod password_hasher;
mod payment_gateway;
mod payment_repository;
mod project_repository;
mod push_notifier;
mod repository_error;
mod subject_repository;
mod subscription_repository;
mod token_service;
mod user_repository;

pub use audit_log_repository::AuditLogRepository;
#[cfg(test)]
pub use audit_log_repository::MockAuditLogRepository;
#[cfg(test)]
pub use blob_store::MockBlobStore;
pub use blob_store::{BlobStore, StorageError, StoredObject};
pub use contact_repository::ContactRepository;
#[cfg(test)]
pub use contact_repository::MockContactRepository;
pub use course_repository::CourseRepository;
#[cfg(test)]
pub use course_repository::MockCourseRepository;
pub use internship_repository::InternshipRepository;
#[cfg(test)]
pub use internship_repository::MockInternshipRepository;
#[cfg(test)]
pub use mailer::MockMailer;
pub use mailer::{EmailMessage, MailError, Mailer};
pub use material_repository::MaterialRepository;
#[cfg(test)]
pub use material_repository::MockMaterialRepository;
pub use notice_repository::{AnnouncementRepository, NoticeRepository};
#[cfg(test)]
pub use notice_repository::{MockAnnouncementRepository, MockNoticeRepository};
#[cfg(test)]
pub use notification_broadcaster::MockNotificationBroadcaster;
pub use notification_broadcaster::{NotificationBroadcaster, NotificationFeed};
#[cfg(test)]
pub use notification_repository::MockNotificationRepository;
pub use notification_repository::NotificationRepository;
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHashError, PasswordHasher};
#[cfg(test)]
pub use payment_gateway::MockPaymentGateway;
pub use payment_gateway::{
    GatewayOrder, GatewayOrderRequest, PaymentGateway, PaymentGatewayError, PaymentLink,
    PaymentLinkRequest,
};
#[cfg(test)]
pub use payment_repository::MockPaymentRepository;
pub use payment_repository::PaymentRepository;
#[cfg(test)]
pub use project_repository::MockProjectRepository;
pub use project_repository::ProjectRepository;
#[cfg(test)]
pub use push_notifier::MockPushNotifier;
pub use push_notifier::{PushError, PushMessage, PushNotifier};
pub use repository_error::RepositoryError;
#[cfg(test)]
pub use subject_repository::MockSubjectRepository;
pub use subject_repository::SubjectRepository;
#[cfg(test)]
pub use subscription_repository::MockSubscriptionRepository;
pub use subscription_repository::SubscriptionRepository;
#[cfg(test)]
pub use token_service::MockTokenService;
pub use token_service::{TokenError, TokenService};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::UserRepository;
