//! Trend Pulse: binary entrypoint.
//! Boots the Axum HTTP server with the AI backend, dashboard state and metrics.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    trend_pulse::init_tracing();

    let router = trend_pulse::app()?;
    Ok(router.into())
}
