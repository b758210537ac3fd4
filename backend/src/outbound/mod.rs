//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **mongo**: MongoDB repositories.
//! - **memory**: in-process repositories used when no database is configured
//!   and in tests.
//! - **storage**: Cloudflare R2 and local-disk blob stores.
//! - **email**: SendGrid and SMTP transports.
//! - **razorpay**, **fcm**: payment gateway and push delivery.
//! - **jwt**, **argon2_hasher**: token signing and password hashing.
//! - **realtime**: broadcast hub feeding WebSocket sessions.
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod argon2_hasher;
pub mod email;
pub mod fcm;
pub mod jwt;
pub mod memory;
pub mod mongo;
pub mod razorpay;
pub mod realtime;
pub mod storage;
