// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ai;
pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod parse;
pub mod prompts;
pub mod service;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::types::{Category, GeneratedContent, Platform, Region, Source, TrendItem};

use axum::Router;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON when `LOG_FORMAT=json`. Filter from `RUST_LOG`.
///
/// Uses `try_init`: the deployment runtime may already have installed a
/// subscriber, in which case this is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trend_pulse=info,tower_http=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        debug!("tracing subscriber already installed");
    }
}

/// Build the full application router from config + environment.
pub fn app() -> anyhow::Result<Router> {
    let cfg = config::AppConfig::load_default()?;
    let client = ai::build_client_from_config(&cfg.ai);
    info!(
        provider = client.provider_name(),
        items_per_fetch = cfg.trends.items_per_fetch,
        "trend pulse starting"
    );

    let metrics = crate::metrics::Metrics::init()?;
    let state = AppState::new(client, cfg.trends);
    Ok(api::router(state).merge(metrics.router()))
}
