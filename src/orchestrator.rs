//! # Fetch Orchestrator
//! Runs every registered adapter as an independent tokio task, applies the
//! adapter-local retry/timeout policy, and caps the whole fan-out with one
//! run deadline. The output is the orchestrator's contract: exactly one
//! `FetchOutcome` per registered adapter, in registration order, no matter
//! what completed, failed or hung.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio::time::Instant;

use crate::sources::types::{FetchError, FetchOutcome};
use crate::sources::RegisteredAdapter;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("tracker_records_total", "Records parsed, by adapter.");
        describe_counter!("tracker_fetch_errors_total", "Adapter fetch failures, by adapter.");
        describe_counter!("tracker_runs_total", "Completed snapshot cycles.");
        describe_counter!("tracker_store_errors_total", "History store append failures.");
        describe_histogram!("tracker_fetch_ms", "Per-adapter fetch latency in milliseconds.");
        describe_histogram!("tracker_run_ms", "Whole fan-out latency in milliseconds.");
        describe_gauge!("tracker_last_run_ts", "Unix ts of the last completed cycle.");
        describe_gauge!("tracker_last_run_failed_adapters", "Failed adapters in the last cycle.");
    });
}

/// Fetch one adapter with bounded retries and exponential backoff. Each
/// attempt is capped by the adapter timeout; the error recorded on
/// exhaustion is the last one seen.
async fn fetch_with_retry(reg: RegisteredAdapter) -> FetchOutcome {
    let started = Instant::now();
    let mut attempt: u32 = 0;

    let last_err = loop {
        attempt += 1;
        let result = tokio::time::timeout(reg.policy.timeout, reg.adapter.fetch()).await;
        match result {
            Ok(Ok(records)) => {
                histogram!("tracker_fetch_ms", "adapter" => reg.name.clone())
                    .record(started.elapsed().as_secs_f64() * 1_000.0);
                return FetchOutcome::success(reg.name, attempt, records);
            }
            Ok(Err(e)) => {
                tracing::warn!(adapter = %reg.name, attempt, error = %e, "fetch attempt failed");
                counter!("tracker_fetch_errors_total", "adapter" => reg.name.clone()).increment(1);
                if attempt >= reg.policy.max_attempts {
                    break e;
                }
            }
            Err(_) => {
                let e = FetchError::Timeout {
                    timeout_ms: reg.policy.timeout.as_millis() as u64,
                };
                tracing::warn!(adapter = %reg.name, attempt, "fetch attempt timed out");
                counter!("tracker_fetch_errors_total", "adapter" => reg.name.clone()).increment(1);
                if attempt >= reg.policy.max_attempts {
                    break e;
                }
            }
        }
        // Exponential backoff between attempts: backoff, 2*backoff, 4*backoff, ...
        tokio::time::sleep(reg.policy.backoff * 2u32.saturating_pow(attempt - 1)).await;
    };

    FetchOutcome::failure(reg.name, attempt, last_err)
}

/// Fan out all adapters concurrently and fan back in. Adapters still pending
/// when the run deadline expires are aborted and recorded as timeouts;
/// results that already completed are kept. One failure never cancels a
/// sibling.
pub async fn run_all(registry: &[RegisteredAdapter], run_deadline: Duration) -> Vec<FetchOutcome> {
    ensure_metrics_described();
    let started = Instant::now();
    let hard_stop = started + run_deadline;

    let handles: Vec<(String, tokio::task::JoinHandle<FetchOutcome>)> = registry
        .iter()
        .map(|reg| (reg.name.clone(), tokio::spawn(fetch_with_retry(reg.clone()))))
        .collect();

    // Awaiting in registration order keeps the output aligned with the
    // registry regardless of completion order; the tasks themselves all run
    // concurrently from the spawn above.
    let mut outcomes = Vec::with_capacity(handles.len());
    for (name, mut handle) in handles {
        match tokio::time::timeout_at(hard_stop, &mut handle).await {
            Ok(Ok(outcome)) => outcomes.push(outcome),
            Ok(Err(join_err)) => {
                tracing::error!(adapter = %name, error = %join_err, "adapter task aborted");
                outcomes.push(FetchOutcome::failure(
                    name,
                    0,
                    FetchError::Unreachable {
                        detail: format!("adapter task failed: {join_err}"),
                    },
                ));
            }
            Err(_) => {
                handle.abort();
                tracing::warn!(adapter = %name, deadline_secs = run_deadline.as_secs(),
                    "adapter still pending at run deadline");
                outcomes.push(FetchOutcome::failure(
                    name,
                    0,
                    FetchError::Timeout {
                        timeout_ms: run_deadline.as_millis() as u64,
                    },
                ));
            }
        }
    }

    histogram!("tracker_run_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
    tracing::info!(
        adapters = outcomes.len(),
        failed = outcomes.iter().filter(|o| !o.is_success()).count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "fan-out complete"
    );
    outcomes
}
