//! Fixed-window request limiter keyed by client IP.
//!
//! The client is the socket peer. `Forwarded` and `X-Forwarded-For` are only
//! honoured when the peer is a configured trusted proxy, otherwise any caller
//! could mint a fresh budget per request. Only paths under `/api` are counted. Once a client spends its budget the
//! limiter answers `429 Too Many Requests` with a `Retry-After` header until
//! the window rolls over.

use std::collections::HashMap;
use std::net::IpAddr;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use mockable::Clock;
use serde_json::json;
use tracing::warn;

use crate::domain::Error as DomainError;

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    hits: u32,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Within budget.
    Allowed,
    /// Budget spent; retry after this many seconds.
    Limited {
        /// Seconds until the current window closes.
        retry_after: u64,
    },
}

/// Shared per-IP window counters.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use chrono::Duration;
/// use digidiploma::middleware::{RateDecision, RateLimiter};
///
/// let limiter = RateLimiter::new(2, Duration::minutes(1), Arc::new(mockable::DefaultClock));
/// assert_eq!(limiter.check("10.0.0.1"), RateDecision::Allowed);
/// ```
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, Window>>>,
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Allow `max_requests` per client in every `window`.
    pub fn new(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
            clock,
        }
    }

    /// Count one request from `client`.
    pub fn check(&self, client: &str) -> RateDecision {
        let now = self.clock.utc();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        // Drop closed windows so the map does not grow with every client seen.
        windows.retain(|_, w| now - w.started_at < self.window);
        let entry = windows.entry(client.to_owned()).or_insert(Window {
            started_at: now,
            hits: 0,
        });
        if entry.hits >= self.max_requests {
            let remaining = (entry.started_at + self.window - now).num_seconds().max(1);
            return RateDecision::Limited {
                retry_after: u64::try_from(remaining).unwrap_or(1),
            };
        }
        entry.hits += 1;
        RateDecision::Allowed
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Middleware applying a [`RateLimiter`] to `/api` requests.
#[derive(Clone)]
pub struct RateLimit {
    limiter: RateLimiter,
    trusted_proxies: Arc<[IpAddr]>,
}

impl RateLimit {
    /// Wrap the shared `limiter`, keying on the socket peer.
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            limiter,
            trusted_proxies: Arc::from(Vec::new()),
        }
    }

    /// Take the client address from forwarding headers when the peer is one
    /// of `proxies`.
    #[must_use]
    pub fn trusting(mut self, proxies: impl IntoIterator<Item = IpAddr>) -> Self {
        self.trusted_proxies = proxies.into_iter().collect();
        self
    }
}

fn client_key(req: &ServiceRequest, trusted_proxies: &[IpAddr]) -> String {
    let Some(peer) = req.peer_addr().map(|addr| addr.ip()) else {
        return "unknown".to_owned();
    };
    if trusted_proxies.contains(&peer) {
        if let Some(forwarded) = req.connection_info().realip_remote_addr() {
            return forwarded.to_owned();
        }
    }
    peer.to_string()
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            trusted_proxies: Arc::clone(&self.trusted_proxies),
        }))
    }
}

/// Service wrapper produced by [`RateLimit`].
pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: RateLimiter,
    trusted_proxies: Arc<[IpAddr]>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if super::is_api_path(req.path()) {
            let client = client_key(&req, &self.trusted_proxies);
            if let RateDecision::Limited { retry_after } = self.limiter.check(&client) {
                warn!(client = %client, retry_after, "rate limit exceeded");
                let error = DomainError::too_many_requests(
                    "Too many requests, please try again later",
                )
                .with_details(json!({ "retryAfter": retry_after }));
                let response = error.error_response();
                return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
            }
        }
        let service = Rc::clone(&self.service);
        Box::pin(async move { Ok(service.call(req).await?.map_into_left_body()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::{clock_at, fixture_timestamp};
    use actix_web::http::StatusCode;
    use actix_web::http::header::RETRY_AFTER;
    use actix_web::test as actix_test;
    use actix_web::{App, HttpResponse, web};
    use chrono::Local;
    use rstest::rstest;

    /// Returns the queued instants in order, then repeats the last one.
    struct SequenceClock(Mutex<Vec<DateTime<Utc>>>);

    impl Clock for SequenceClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            let mut queue = self.0.lock().expect("clock lock");
            if queue.len() > 1 {
                queue.remove(0)
            } else {
                queue.first().copied().unwrap_or_else(fixture_timestamp)
            }
        }
    }

    fn advancing_clock(times: Vec<DateTime<Utc>>) -> Arc<dyn Clock> {
        Arc::new(SequenceClock(Mutex::new(times)))
    }

    #[rstest]
    fn allows_budget_then_limits() {
        let limiter = RateLimiter::new(2, Duration::minutes(15), clock_at(fixture_timestamp()));
        assert_eq!(limiter.check("a"), RateDecision::Allowed);
        assert_eq!(limiter.check("a"), RateDecision::Allowed);
        assert_eq!(
            limiter.check("a"),
            RateDecision::Limited { retry_after: 900 }
        );
    }

    #[rstest]
    fn clients_have_separate_budgets() {
        let limiter = RateLimiter::new(1, Duration::minutes(1), clock_at(fixture_timestamp()));
        assert_eq!(limiter.check("a"), RateDecision::Allowed);
        assert_eq!(limiter.check("b"), RateDecision::Allowed);
        assert!(matches!(limiter.check("a"), RateDecision::Limited { .. }));
    }

    #[rstest]
    fn window_rolls_over() {
        let start = fixture_timestamp();
        let clock = advancing_clock(vec![
            start,
            start + Duration::seconds(30),
            start + Duration::seconds(61),
        ]);
        let limiter = RateLimiter::new(1, Duration::minutes(1), clock);
        assert_eq!(limiter.check("a"), RateDecision::Allowed);
        assert_eq!(
            limiter.check("a"),
            RateDecision::Limited { retry_after: 30 }
        );
        assert_eq!(limiter.check("a"), RateDecision::Allowed);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[actix_web::test]
    async fn responds_429_with_retry_after() {
        let limiter = RateLimiter::new(1, Duration::minutes(15), clock_at(fixture_timestamp()));
        let app = actix_test::init_service(
            App::new()
                .wrap(RateLimit::new(limiter))
                .route("/api/ping", web::get().to(|| async { HttpResponse::Ok().finish() }))
                .route("/health/live", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let first = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/api/ping").to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri("/api/ping").to_request()).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            second.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()),
            Some("900")
        );
        let body: serde_json::Value = actix_test::read_body_json(second).await;
        assert_eq!(body["code"], "too_many_requests");

        let health =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri("/health/live").to_request())
                .await;
        assert_eq!(health.status(), StatusCode::OK);
    }

    fn ping_from(peer: &str, forwarded_for: &str) -> actix_http::Request {
        actix_test::TestRequest::get()
            .uri("/api/ping")
            .peer_addr(peer.parse().expect("socket addr"))
            .insert_header(("X-Forwarded-For", forwarded_for))
            .to_request()
    }

    #[actix_web::test]
    async fn forwarded_headers_from_untrusted_peers_share_one_budget() {
        let limiter = RateLimiter::new(1, Duration::minutes(15), clock_at(fixture_timestamp()));
        let app = actix_test::init_service(
            App::new()
                .wrap(RateLimit::new(limiter))
                .route("/api/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let first = actix_test::call_service(&app, ping_from("203.0.113.9:4000", "10.0.0.1")).await;
        assert_eq!(first.status(), StatusCode::OK);
        for n in 2..6 {
            let res = actix_test::call_service(
                &app,
                ping_from("203.0.113.9:4000", &format!("10.0.0.{n}")),
            )
            .await;
            assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        }
    }

    #[actix_web::test]
    async fn trusted_proxy_forwards_the_client_address() {
        let proxy: IpAddr = "10.1.0.2".parse().expect("ip");
        let limiter = RateLimiter::new(1, Duration::minutes(15), clock_at(fixture_timestamp()));
        let app = actix_test::init_service(
            App::new()
                .wrap(RateLimit::new(limiter).trusting([proxy]))
                .route("/api/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        for client in ["198.51.100.7", "198.51.100.8"] {
            let res = actix_test::call_service(&app, ping_from("10.1.0.2:443", client)).await;
            assert_eq!(res.status(), StatusCode::OK, "{client} has its own budget");
        }
        let repeat = actix_test::call_service(&app, ping_from("10.1.0.2:443", "198.51.100.7")).await;
        assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
