//! DigiDiploma backend library modules.
//!
//! The domain layer owns entities, ports, and services; `inbound` adapts
//! HTTP and WebSocket traffic onto it and `outbound` implements its ports.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
/// Request tracing middleware attaching a `trace-id` to every request.
pub use middleware::Trace;
