//! MongoDB persistence adapters.
//!
//! Each repository owns a typed `Collection<...Document>` and translates
//! between the stored document and the domain entity. Identifiers are stored
//! as BSON ObjectIds and timestamps as BSON dates; everything else reuses the
//! domain types' serde contracts.
//!
//! # Example
//!
//! ```ignore
//! use digidiploma::outbound::mongo::{MongoConfig, MongoDatabase, MongoUserRepository};
//!
//! let db = MongoDatabase::connect(&MongoConfig::new("mongodb://localhost:27017", "digidiploma")).await?;
//! db.ensure_indexes().await?;
//! let users = MongoUserRepository::new(&db);
//! ```

mod academics;
mod bson_helpers;
mod client;
mod commerce;
mod error_mapping;
mod inbox;
mod people;
mod submissions;

pub use academics::{MongoMaterialRepository, MongoSubjectRepository};
pub use client::{MongoConfig, MongoDatabase, MongoError};
pub use commerce::{MongoCourseRepository, MongoPaymentRepository, MongoSubscriptionRepository};
pub use inbox::{MongoAnnouncementRepository, MongoNoticeRepository, MongoNotificationRepository};
pub use people::{MongoAuditLogRepository, MongoUserRepository};
pub use submissions::{MongoContactRepository, MongoInternshipRepository, MongoProjectRepository};
