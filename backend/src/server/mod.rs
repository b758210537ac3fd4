//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::{AppConfig, BuildMode, ConfigError};

use std::path::PathBuf;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::body::MessageBody;
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::DefaultHeaders;
use actix_web::{App, HttpServer, web};
use tracing::info;
use url::Url;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use digidiploma::ApiDoc;
use digidiploma::Trace;
use digidiploma::inbound::http::health::{HealthState, live, ready};
use digidiploma::inbound::http::multipart::MAX_FILE_BYTES;
use digidiploma::inbound::http::routes;
use digidiploma::inbound::ws;
use digidiploma::middleware::{MaintenanceGate, RateLimit, RateLimiter};

use state_builders::{ServerState, build_server_state};

/// JSON bodies are small; files travel as multipart.
const JSON_LIMIT_BYTES: usize = 1024 * 1024;
const CORS_MAX_AGE_SECS: usize = 60 * 60;
const CONTENT_SECURITY_POLICY: &str =
    "default-src 'self'; img-src 'self' data: https:; object-src 'none'; frame-ancestors 'none'";

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    state: ServerState,
    rate_limit: RateLimit,
    cors_origins: Vec<Url>,
    upload_dir: PathBuf,
}

fn cors(origins: &[Url]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| {
            cors.allowed_origin(&origin.origin().ascii_serialization())
        })
        .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::HeaderName::from_static(digidiploma::domain::TRACE_ID_HEADER)])
        .supports_credentials()
        .max_age(CORS_MAX_AGE_SECS)
}

fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY))
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::X_FRAME_OPTIONS, "DENY"))
        .add((header::REFERRER_POLICY, "strict-origin-when-cross-origin"))
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        state,
        rate_limit,
        cors_origins,
        upload_dir,
    } = deps;

    let gate = MaintenanceGate::new(state.maintenance, state.tokens, state.clock);

    let app = App::new()
        .app_data(health_state)
        .app_data(state.http)
        .app_data(state.ws)
        .app_data(web::JsonConfig::default().limit(JSON_LIMIT_BYTES))
        .app_data(web::PayloadConfig::default().limit(MAX_FILE_BYTES))
        .wrap(gate)
        .wrap(rate_limit)
        .wrap(security_headers())
        .wrap(cors(&cors_origins))
        .wrap(Trace)
        .configure(routes::configure)
        .service(ws::ws_entry)
        .service(ready)
        .service(live)
        .service(Files::new("/uploads", upload_dir));

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct the HTTP server from `config`.
///
/// # Errors
/// Propagates [`std::io::Error`] when an adapter cannot be initialised or
/// the socket cannot be bound.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    config: AppConfig,
) -> std::io::Result<Server> {
    let state = build_server_state(&config).await?;
    let rate_limit = RateLimit::new(RateLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.window,
        state.clock.clone(),
    ))
    .trusting(config.rate_limit.trusted_proxies.iter().copied());
    let deps = AppDependencies {
        health_state: health_state.clone(),
        state,
        rate_limit,
        cors_origins: config.cors_origins.clone(),
        upload_dir: config.storage.upload_dir.clone(),
    };

    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(config.bind_addr)?
        .run();

    info!(addr = %config.bind_addr, "DigiDiploma API listening");
    health_state.mark_ready();
    Ok(server)
}
