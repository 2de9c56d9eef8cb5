//! # Snapshot Pipeline
//! The single entry point one scheduled run flows through: fan out to all
//! adapters, normalize the outcomes into a snapshot, look up the prior
//! snapshot for deltas, render, and archive. Archiving failures are logged
//! and surfaced on the report, never allowed to eat the report itself.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};

use crate::config::TrackerConfig;
use crate::report::{render, RenderedReport};
use crate::snapshot::{build_snapshot, NormalizerRules};
use crate::sources::{build_registry, RegisteredAdapter};
use crate::store::HistoryStore;
use crate::{orchestrator, store};

pub struct Pipeline {
    registry: Vec<RegisteredAdapter>,
    rules: NormalizerRules,
    run_deadline: Duration,
    store: Arc<HistoryStore>,
}

impl Pipeline {
    pub fn from_config(cfg: &TrackerConfig, store: Arc<HistoryStore>) -> Self {
        Self {
            registry: build_registry(cfg),
            rules: NormalizerRules::from(&cfg.normalizer),
            run_deadline: Duration::from_secs(cfg.orchestrator.run_deadline_secs),
            store,
        }
    }

    /// Assemble a pipeline from parts; integration tests register mock
    /// adapters this way.
    pub fn new(
        registry: Vec<RegisteredAdapter>,
        rules: NormalizerRules,
        run_deadline: Duration,
        store: Arc<HistoryStore>,
    ) -> Self {
        Self {
            registry,
            rules,
            run_deadline,
            store,
        }
    }

    pub fn adapter_count(&self) -> usize {
        self.registry.len()
    }

    /// Run one complete snapshot cycle. Always returns a report; a store
    /// that cannot be read only costs the deltas, a store that cannot be
    /// written only costs the archive id.
    pub async fn run_snapshot_cycle(&self) -> RenderedReport {
        let generated_at = Utc::now();
        tracing::info!(adapters = self.registry.len(), "snapshot cycle started");

        let outcomes = orchestrator::run_all(&self.registry, self.run_deadline).await;
        let snapshot = build_snapshot(generated_at, outcomes, &self.rules);

        let prior = match self.store.latest_before(generated_at).await {
            Ok(prior) => prior,
            Err(e) => {
                tracing::warn!(error = %e, "prior snapshot unavailable, skipping deltas");
                None
            }
        };

        let mut report = render(&snapshot, prior.as_ref());

        match self.store.append(&snapshot).await {
            Ok(id) => {
                tracing::info!(entry = %id, "snapshot archived");
                report.archived = Some(id);
            }
            Err(e @ store::StoreError::WriteConflict { .. }) => {
                tracing::error!(error = %e, "snapshot not archived");
                counter!("tracker_store_errors_total", "kind" => "conflict").increment(1);
            }
            Err(e) => {
                tracing::error!(error = %e, "snapshot not archived");
                counter!("tracker_store_errors_total", "kind" => "unavailable").increment(1);
            }
        }

        let failed = snapshot.failed_outcomes().count();
        counter!("tracker_runs_total").increment(1);
        gauge!("tracker_last_run_ts").set(generated_at.timestamp() as f64);
        gauge!("tracker_last_run_failed_adapters").set(failed as f64);
        tracing::info!(
            health = %snapshot.health,
            failed,
            archived = report.archived.is_some(),
            "snapshot cycle finished"
        );

        report
    }
}
