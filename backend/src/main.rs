//! Backend entry-point: reads configuration, wires adapters, and serves the
//! REST API, WebSocket notifications, and OpenAPI docs.

mod server;

use actix_web::web;
use mockable::DefaultEnv;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use digidiploma::inbound::http::health::HealthState;
use server::{AppConfig, BuildMode, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = AppConfig::from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(std::io::Error::other)?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config).await?;
    server.await
}
