// src/metrics.rs
use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Prometheus recorder wiring. Installed once at startup; the handle renders
/// the exposition text for the /metrics route.
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    pub fn init(configured_adapters: usize) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        gauge!("tracker_configured_adapters").set(configured_adapters as f64);

        Self { handle }
    }

    pub fn router(&self) -> Router {
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
