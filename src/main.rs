//! Daily Market Tracker — Binary Entrypoint
//! Boots the Axum operator surface, wires the pipeline and history store,
//! and spawns the interval scheduler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use daily_market_tracker::api::{self, AppState};
use daily_market_tracker::metrics::Metrics;
use daily_market_tracker::pipeline::Pipeline;
use daily_market_tracker::scheduler::spawn_scheduler;
use daily_market_tracker::store::HistoryStore;
use daily_market_tracker::TrackerConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("daily_market_tracker=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op where the environment is already set.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = TrackerConfig::load_default().context("loading tracker config")?;

    let store = Arc::new(
        HistoryStore::open(cfg.store.path.clone()).context("opening history store")?,
    );
    let pipeline = Arc::new(Pipeline::from_config(&cfg, store));
    let metrics = Metrics::init(pipeline.adapter_count());

    let state = AppState::new(pipeline.clone());
    if cfg.schedule.enabled {
        spawn_scheduler(
            pipeline,
            state.last_report.clone(),
            Duration::from_secs(cfg.schedule.interval_secs),
        );
    }

    let router = api::create_router(state).merge(metrics.router());
    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;
    tracing::info!(addr = %cfg.server.bind, "daily market tracker listening");
    axum::serve(listener, router).await?;

    Ok(())
}
