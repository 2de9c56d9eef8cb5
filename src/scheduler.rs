// src/scheduler.rs
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::pipeline::Pipeline;
use crate::report::RenderedReport;

/// Spawn the interval task that drives scheduled runs. Each tick invokes one
/// snapshot cycle and publishes the report for the HTTP surface; runs are
/// independent, so a tick firing while a previous run still drags on is
/// tolerated (the store serializes the writers).
pub fn spawn_scheduler(
    pipeline: Arc<Pipeline>,
    last_report: Arc<RwLock<Option<RenderedReport>>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = pipeline.run_snapshot_cycle().await;
            tracing::info!(
                target: "scheduler",
                health = %report.health,
                archived = report.archived.is_some(),
                "scheduled cycle complete"
            );
            *last_report.write().expect("last report lock poisoned") = Some(report);
        }
    })
}
