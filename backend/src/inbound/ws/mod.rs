//! WebSocket inbound adapter pushing notifications to signed-in clients.
//!
//! Responsibilities:
//! - validate upgrade requests (origin allow-list, bearer token)
//! - subscribe the connection to the notification feed before upgrading
//! - keep WebSocket-specific concerns at the edge of the system

use actix_web::http::header::{HeaderValue, ORIGIN};
use actix_web::web::{self, Payload};
use actix_web::{HttpRequest, HttpResponse, get};
use serde::Deserialize;
use tracing::{debug, error, warn};
use url::Url;

use crate::domain::{CurrentUser, ExpiryPolicy};
use crate::inbound::http::auth::bearer_token;

mod session;

pub mod messages;
pub mod state;

use state::WsState;

/// `?token=` carrying the access token, as browsers cannot set headers on
/// WebSocket upgrades.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Handle WebSocket upgrade for the `/ws` endpoint.
#[get("/ws")]
pub async fn ws_entry(
    state: web::Data<WsState>,
    req: HttpRequest,
    query: web::Query<WsQuery>,
    stream: Payload,
) -> actix_web::Result<HttpResponse> {
    let mut origin_iter = req.headers().get_all(ORIGIN);
    let origin_header = origin_iter.next().ok_or_else(|| {
        error!("Missing Origin header on WebSocket upgrade");
        actix_web::error::ErrorForbidden("Origin not allowed")
    })?;
    if origin_iter.next().is_some() {
        error!("Multiple Origin headers on WebSocket upgrade");
        return Err(actix_web::error::ErrorBadRequest("Invalid Origin header"));
    }
    validate_origin(&state, origin_header)?;

    let token = query
        .token
        .as_deref()
        .or_else(|| bearer_token(req.headers()))
        .ok_or_else(|| crate::domain::Error::unauthorized("Authentication required"))?;
    let user = state
        .accounts
        .authenticate(token, ExpiryPolicy::Strict)
        .await?;
    let user = CurrentUser::from(&user);

    let events = state.feed.subscribe();
    let (response, session, messages) = actix_ws::handle(&req, stream).map_err(|error| {
        error!(error = %error, "WebSocket upgrade failed");
        actix_web::error::ErrorInternalServerError("WebSocket upgrade failed")
    })?;
    debug!(user_id = %user.id, "notification socket opened");
    actix_web::rt::spawn(session::handle_ws_session(user, events, session, messages));
    Ok(response)
}

fn validate_origin(state: &WsState, origin_header: &HeaderValue) -> actix_web::Result<()> {
    let origin_value = match origin_header.to_str() {
        Ok(value) => value,
        Err(error) => {
            error!(error = %error, "Failed to parse Origin header as string");
            return Err(actix_web::error::ErrorBadRequest("Invalid Origin header"));
        }
    };

    let origin = Url::parse(origin_value).map_err(|error| {
        error!(error = %error, "Failed to parse Origin header as URL");
        actix_web::error::ErrorBadRequest("Invalid Origin header")
    })?;

    if state.allows(&origin) {
        Ok(())
    } else {
        warn!(
            origin = origin_value,
            "Rejected WS upgrade due to disallowed Origin"
        );
        Err(actix_web::error::ErrorForbidden("Origin not allowed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::NotificationFeed;
    use crate::test_support::TestHarness;
    use actix_web::http::StatusCode;
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    #[fixture]
    fn state() -> WsState {
        let harness = TestHarness::new();
        WsState::new(
            harness.state.accounts.clone(),
            Arc::clone(&harness.hub) as Arc<dyn NotificationFeed>,
            vec![
                Url::parse("http://localhost:5173").expect("url"),
                Url::parse("https://digidiploma.in").expect("url"),
            ],
        )
    }

    fn header(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).expect("valid header value")
    }

    #[rstest]
    #[case("http://localhost:5173")]
    #[case("https://digidiploma.in")]
    #[case("https://digidiploma.in/")]
    fn accepts_configured_origins(state: WsState, #[case] origin: &str) {
        assert!(validate_origin(&state, &header(origin)).is_ok());
    }

    #[rstest]
    #[case("http://localhost:3000")]
    #[case("http://digidiploma.in")]
    #[case("https://digidiploma.in.evil.com")]
    #[case("https://admin.digidiploma.in")]
    fn rejects_disallowed_origins(state: WsState, #[case] origin: &str) {
        let error = validate_origin(&state, &header(origin)).expect_err("origin should be rejected");
        assert_eq!(
            error.as_response_error().status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[rstest]
    fn rejects_non_utf8_origin_header(state: WsState) {
        let header = HeaderValue::from_bytes(&[0x80]).expect("opaque header value");
        let error = validate_origin(&state, &header).expect_err("origin should be rejected");
        assert_eq!(
            error.as_response_error().status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[rstest]
    fn rejects_unparsable_origin_header(state: WsState) {
        let header = HeaderValue::from_static("not a url");
        let error = validate_origin(&state, &header).expect_err("origin should be rejected");
        assert_eq!(
            error.as_response_error().status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
