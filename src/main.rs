//! Topic pulse service binary entrypoint.
//! Boots the Axum HTTP server with adapters, engine and user store wired from
//! config files and environment.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use topic_pulse::config::ServerConfig;

/// Structured logs. `LOG_FORMAT=json` switches to JSON lines; `RUST_LOG`
/// overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("topic_pulse=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    // The runtime may already have installed a subscriber; keep it if so.
    let _ = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let router = topic_pulse::app(ServerConfig::from_env()).await?;
    Ok(router.into())
}
