//! Request middleware.
//!
//! Purpose: Define middleware components for request lifecycle concerns:
//! correlation ids, per-client rate limiting, and the maintenance gate.

pub mod maintenance;
pub mod rate_limit;
pub mod trace;

pub use maintenance::MaintenanceGate;
pub use rate_limit::{RateDecision, RateLimit, RateLimiter};
pub use trace::Trace;

/// Whether `path` is the `/api` root or lies beneath it.
pub(crate) fn is_api_path(path: &str) -> bool {
    path.strip_prefix("/api")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
