//! In-process repositories used when no MongoDB URI is configured.
//!
//! Every adapter keeps its rows in a [`Collection`] guarded by an async
//! `RwLock`. Filtering reuses the `matches` helpers on the domain filter
//! types so the behaviour mirrors the MongoDB queries. Data is lost on
//! restart; this backend exists for local development and tests.

mod academics;
mod collection;
mod commerce;
mod inbox;
mod people;
mod submissions;

pub use academics::{MemoryMaterialRepository, MemorySubjectRepository};
pub use commerce::{
    MemoryCourseRepository, MemoryPaymentRepository, MemorySubscriptionRepository,
};
pub use inbox::{
    MemoryAnnouncementRepository, MemoryNoticeRepository, MemoryNotificationRepository,
};
pub use people::{MemoryAuditLogRepository, MemoryUserRepository};
pub use submissions::{
    MemoryContactRepository, MemoryInternshipRepository, MemoryProjectRepository,
};

use collection::Collection;
