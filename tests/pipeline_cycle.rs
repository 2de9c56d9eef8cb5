// tests/pipeline_cycle.rs
// End-to-end cycles against a real temp-file store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use daily_market_tracker::pipeline::Pipeline;
use daily_market_tracker::snapshot::{Health, NormalizerRules};
use daily_market_tracker::sources::types::{CryptoQuote, FetchError, SourceRecord};
use daily_market_tracker::sources::{FetchPolicy, RegisteredAdapter, SourceAdapter};
use daily_market_tracker::store::HistoryStore;

struct BtcAdapter {
    price: f64,
}

#[async_trait::async_trait]
impl SourceAdapter for BtcAdapter {
    async fn fetch(&self) -> Result<Vec<SourceRecord>, FetchError> {
        Ok(vec![SourceRecord::CryptoAsset(CryptoQuote {
            symbol: "BTC".into(),
            name: "Bitcoin".into(),
            price_usd: self.price,
            change_24h: 1.0,
            change_7d: 2.0,
            market_cap: 1.9e12,
            volume_24h: 3.0e10,
            is_meme: false,
            source: "crypto".into(),
            observed_at: Utc::now(),
        })])
    }
    fn name(&self) -> &'static str {
        "crypto"
    }
}

struct HangingAdapter;

#[async_trait::async_trait]
impl SourceAdapter for HangingAdapter {
    async fn fetch(&self) -> Result<Vec<SourceRecord>, FetchError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(vec![])
    }
    fn name(&self) -> &'static str {
        "futures"
    }
}

fn policy() -> FetchPolicy {
    FetchPolicy {
        timeout: Duration::from_millis(150),
        max_attempts: 1,
        backoff: Duration::from_millis(1),
    }
}

fn pipeline_with(
    adapters: Vec<RegisteredAdapter>,
    store: Arc<HistoryStore>,
) -> Pipeline {
    Pipeline::new(
        adapters,
        NormalizerRules::default(),
        Duration::from_secs(5),
        store,
    )
}

#[tokio::test]
async fn first_cycle_archives_and_has_no_deltas() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(HistoryStore::open(dir.path().join("h.jsonl")).unwrap());
    let pipeline = pipeline_with(
        vec![RegisteredAdapter::new(
            Arc::new(BtcAdapter { price: 98250.0 }),
            policy(),
        )],
        store.clone(),
    );

    let report = pipeline.run_snapshot_cycle().await;
    assert_eq!(report.health, Health::Complete);
    assert!(report.archived.is_some());
    assert!(!report.text.contains("d/d"));
    assert_eq!(store.len().await.unwrap(), 1);
}

#[tokio::test]
async fn second_cycle_renders_day_over_day_delta() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(HistoryStore::open(dir.path().join("h.jsonl")).unwrap());

    let day1 = pipeline_with(
        vec![RegisteredAdapter::new(
            Arc::new(BtcAdapter { price: 98250.0 }),
            policy(),
        )],
        store.clone(),
    );
    day1.run_snapshot_cycle().await;

    let day2 = pipeline_with(
        vec![RegisteredAdapter::new(
            Arc::new(BtcAdapter { price: 100250.0 }),
            policy(),
        )],
        store.clone(),
    );
    let report = day2.run_snapshot_cycle().await;

    assert!(
        report.text.contains("d/d +2000.00 (+2.04%)"),
        "missing BTC delta in:\n{}",
        report.text
    );
    assert_eq!(store.len().await.unwrap(), 2);
}

#[tokio::test]
async fn hanging_adapter_yields_partial_report_that_names_it() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(HistoryStore::open(dir.path().join("h.jsonl")).unwrap());
    let pipeline = pipeline_with(
        vec![
            RegisteredAdapter::new(Arc::new(BtcAdapter { price: 98250.0 }), policy()),
            RegisteredAdapter::new(Arc::new(HangingAdapter), policy()),
        ],
        store.clone(),
    );

    let report = pipeline.run_snapshot_cycle().await;
    assert_eq!(report.health, Health::Partial);
    assert!(report.text.contains("futures"));
    assert!(report.text.contains("unavailable: timed out"));
    // The snapshot still carries one outcome per adapter.
    let outcomes = report.snapshot["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
}

#[tokio::test]
async fn store_failure_costs_the_archive_id_not_the_report() {
    let dir = tempfile::tempdir().unwrap();
    // The store path is a directory, so every file operation fails.
    let store = Arc::new(HistoryStore::open(dir.path().to_path_buf()).unwrap());
    let pipeline = pipeline_with(
        vec![RegisteredAdapter::new(
            Arc::new(BtcAdapter { price: 98250.0 }),
            policy(),
        )],
        store,
    );

    let report = pipeline.run_snapshot_cycle().await;
    assert_eq!(report.health, Health::Complete);
    assert!(report.archived.is_none());
    assert!(report.text.contains("BTC"));
}

#[tokio::test]
async fn overlapping_cycles_each_archive_an_intact_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(HistoryStore::open(dir.path().join("h.jsonl")).unwrap());

    let a = Arc::new(pipeline_with(
        vec![RegisteredAdapter::new(
            Arc::new(BtcAdapter { price: 98250.0 }),
            policy(),
        )],
        store.clone(),
    ));
    let b = Arc::new(pipeline_with(
        vec![RegisteredAdapter::new(
            Arc::new(BtcAdapter { price: 98300.0 }),
            policy(),
        )],
        store.clone(),
    ));

    let (ra, rb) = tokio::join!(
        {
            let a = a.clone();
            async move { a.run_snapshot_cycle().await }
        },
        {
            let b = b.clone();
            async move { b.run_snapshot_cycle().await }
        }
    );
    assert!(ra.archived.is_some());
    assert!(rb.archived.is_some());
    assert_eq!(store.len().await.unwrap(), 2);
}
