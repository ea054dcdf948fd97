use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process and describe the series.
    /// Later calls reuse the first handle.
    pub fn init() -> Result<Self> {
        let handle = HANDLE.get_or_try_init(|| -> Result<PrometheusHandle> {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .context("prometheus: install recorder")?;
            describe();
            Ok(handle)
        })?;
        Ok(Self {
            handle: handle.clone(),
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("trends_fetch_total", "Trend feed fetches issued.");
    describe_counter!("trends_fetch_errors_total", "Trend feed fetches that failed.");
    describe_counter!("trends_items_parsed_total", "Trend items parsed from responses.");
    describe_counter!(
        "trends_segments_dropped_total",
        "Response segments dropped for lacking a headline."
    );
    describe_counter!("posts_generated_total", "Social drafts generated.");
    describe_counter!("posts_failed_total", "Social drafts replaced by a placeholder.");
    describe_counter!("speech_requests_total", "Speech synthesis requests.");
    describe_counter!("speech_failed_total", "Speech requests that produced no audio.");
    describe_counter!("ai_limit_rejections_total", "Calls refused by the daily limit.");
    describe_histogram!("ai_request_ms", "Backend request latency in milliseconds.");
}
