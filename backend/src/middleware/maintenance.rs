//! Maintenance gate parking non-admin API traffic.
//!
//! While [`MaintenanceMode`] is enabled, requests under `/api` answer
//! `503 Service Unavailable` unless the path is exempt (login, token refresh,
//! the status probe) or the bearer token carries the admin role. The token is
//! only decoded here; the account itself is loaded later by the extractors.

use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use mockable::Clock;
use serde_json::json;
use tracing::debug;

use crate::domain::ports::TokenService;
use crate::domain::{
    Error as DomainError, ExpiryPolicy, MaintenanceMode, UserRole, is_maintenance_exempt,
};
use crate::inbound::http::auth::bearer_token;

/// Middleware consulting the shared maintenance switch.
#[derive(Clone)]
pub struct MaintenanceGate {
    inner: Rc<GateState>,
}

struct GateState {
    mode: Arc<MaintenanceMode>,
    tokens: Arc<dyn TokenService>,
    clock: Arc<dyn Clock>,
}

impl GateState {
    fn caller_is_admin(&self, req: &ServiceRequest) -> bool {
        bearer_token(req.headers())
            .and_then(|token| {
                self.tokens
                    .decode(token, ExpiryPolicy::Strict, self.clock.utc())
                    .ok()
            })
            .is_some_and(|claims| claims.role == UserRole::Admin)
    }

    fn blocks(&self, req: &ServiceRequest) -> bool {
        self.mode.is_enabled()
            && super::is_api_path(req.path())
            && !is_maintenance_exempt(req.path())
            && !self.caller_is_admin(req)
    }
}

impl MaintenanceGate {
    /// Gate requests on `mode`, recognising admins through `tokens`.
    pub fn new(
        mode: Arc<MaintenanceMode>,
        tokens: Arc<dyn TokenService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Rc::new(GateState {
                mode,
                tokens,
                clock,
            }),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MaintenanceGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = MaintenanceGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MaintenanceGateMiddleware {
            service,
            state: Rc::clone(&self.inner),
        }))
    }
}

/// Service wrapper produced by [`MaintenanceGate`].
pub struct MaintenanceGateMiddleware<S> {
    service: S,
    state: Rc<GateState>,
}

impl<S, B> Service<ServiceRequest> for MaintenanceGateMiddleware<S>
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
        if self.state.blocks(&req) {
            debug!(path = %req.path(), "request parked by maintenance mode");
            let status = self.state.mode.status();
            let response = DomainError::service_unavailable(status.message)
                .with_details(json!({ "maintenance": true }))
                .error_response();
            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }
        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
    }
}
