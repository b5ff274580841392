// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ai_bootstrap;
pub mod analyze;
pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod service;
pub mod telemetry;
pub mod users;

pub use crate::api::{router, AppState};
pub use crate::service::AnalysisService;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing::{info, warn};

use crate::ai_bootstrap::EngineRuntime;
use crate::analyze::{DynEngine, QueryRefiner};
use crate::config::{ServerConfig, SourcesConfig};
use crate::error::SourceError;
use crate::ingest::providers::{
    google_trends::GoogleTrendsAdapter, quora::QuoraAdapter, reddit::RedditAdapter,
    twitter::TwitterAdapter, wikipedia::WikipediaAdapter, youtube::YoutubeAdapter,
};
use crate::ingest::{Aggregator, AggregatorBuilder, SourceAdapter};
use crate::users::UserDirectory;

pub const ENV_YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_TWITTER_BEARER_TOKEN: &str = "TWITTER_BEARER_TOKEN";

fn credential(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn with_adapter<A>(builder: AggregatorBuilder, name: &str, built: Result<A, SourceError>) -> AggregatorBuilder
where
    A: SourceAdapter + 'static,
{
    match built {
        Ok(a) => builder.adapter(Arc::new(a)),
        Err(e) => {
            warn!(target: "aggregate", adapter = name, error = %e, "adapter unavailable; running disabled");
            builder
        }
    }
}

/// Wire the real platform adapters. Platforms whose credentials are missing
/// stay unregistered and the builder fills them with disabled stand-ins.
pub fn build_aggregator(cfg: &SourcesConfig, engine: &DynEngine) -> Aggregator {
    let mut b = Aggregator::builder().config(cfg);

    b = with_adapter(b, "reddit", RedditAdapter::new());
    match credential(ENV_YOUTUBE_API_KEY) {
        Some(key) => b = with_adapter(b, "youtube", YoutubeAdapter::new(key)),
        None => info!(target: "aggregate", "YOUTUBE_API_KEY not set; youtube disabled"),
    }
    match credential(ENV_TWITTER_BEARER_TOKEN) {
        Some(token) => b = with_adapter(b, "twitter", TwitterAdapter::new(token)),
        None => info!(target: "aggregate", "TWITTER_BEARER_TOKEN not set; twitter disabled"),
    }
    b = with_adapter(b, "quora", QuoraAdapter::new());
    b = with_adapter(b, "wikipedia", WikipediaAdapter::new());

    match GoogleTrendsAdapter::new() {
        Ok(t) => b = b.trends(Arc::new(t)),
        Err(e) => warn!(target: "aggregate", error = %e, "trends unavailable; running disabled"),
    }

    let refiner = cfg
        .refine_reddit_query
        .then(|| QueryRefiner::new(engine.clone()));
    b.refiner(refiner).build()
}

/// Build the full HTTP application from config files and environment.
pub async fn app(server: ServerConfig) -> anyhow::Result<Router> {
    let sources = SourcesConfig::load_default().context("loading sources config")?;
    let runtime = EngineRuntime::load_default().context("loading engine config")?;

    if std::env::var("AI_QUICK_PROBE").ok().is_some_and(|v| v == "1") {
        runtime.quick_probe().await;
    }

    let aggregator = build_aggregator(&sources, &runtime.engine);
    let service = AnalysisService::new(aggregator, runtime.engine.clone());
    let users = UserDirectory::open(&server.users_file)
        .with_context(|| format!("opening user store {}", server.users_file.display()))?;

    info!(
        target: "api",
        timeout_secs = sources.timeout_secs,
        provider = runtime.engine.provider_name(),
        users_file = %server.users_file.display(),
        "service ready"
    );

    let state = AppState {
        service: Arc::new(service),
        users: Arc::new(users),
    };
    let mut app = router(state, &server);

    if server.debug_routes {
        match telemetry::Metrics::init() {
            Ok(m) => app = app.merge(m.router()),
            Err(e) => warn!(target: "api", error = %e, "metrics route not mounted"),
        }
    }
    Ok(app)
}
