//! Request correlation identifier.
//!
//! A `TraceId` follows one HTTP request (or WebSocket session) through
//! handlers, services, and adapters. It lives in Tokio task-local storage so
//! `Error` constructors and log statements can pick it up without threading it
//! through every signature. Spawned tasks do not inherit it; wrap their
//! futures in [`TraceId::scope`].

use std::future::Future;

use tokio::task_local;
use uuid::Uuid;

task_local! {
    static CURRENT_TRACE: TraceId;
}

/// Correlation identifier stored for the lifetime of a request.
///
/// # Examples
/// ```
/// use digidiploma::domain::TraceId;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let id = TraceId::generate();
/// let seen = TraceId::scope(id, async { TraceId::current() }).await;
/// assert_eq!(seen, Some(id));
/// # });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reuse a caller-supplied identifier when it is a valid UUID.
    ///
    /// Proxies and the SPA may forward their own `trace-id`; anything that does
    /// not parse is ignored and a new id is generated instead.
    #[must_use]
    pub fn from_header_or_generate(header: Option<&str>) -> Self {
        header
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or_else(Self::generate)
    }

    /// The identifier in scope for the running task, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT_TRACE.try_with(|id| *id).ok()
    }

    /// Underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Run `fut` with `trace_id` in scope.
    pub async fn scope<Fut>(trace_id: TraceId, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        CURRENT_TRACE.scope(trace_id, fut).await
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn current_reflects_scope() {
        let expected = TraceId::generate();
        let observed = TraceId::scope(expected, async move { TraceId::current() }).await;
        assert_eq!(observed, Some(expected));
    }

    #[tokio::test]
    async fn current_is_none_out_of_scope() {
        assert!(TraceId::current().is_none());
    }

    #[rstest]
    fn reuses_valid_header_value() {
        let raw = "6f1e0c36-1f8b-4f64-9d0a-2d7e0f3c9b11";
        let id = TraceId::from_header_or_generate(Some(raw));
        assert_eq!(id.to_string(), raw);
    }

    #[rstest]
    #[case(None)]
    #[case(Some("not-a-uuid"))]
    #[case(Some(""))]
    fn generates_when_header_is_unusable(#[case] header: Option<&str>) {
        let id = TraceId::from_header_or_generate(header);
        assert_ne!(id.as_uuid(), &Uuid::nil());
    }
}
