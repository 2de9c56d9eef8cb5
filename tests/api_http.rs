// tests/api_http.rs
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use http::{Request, StatusCode};
use tower::ServiceExt;

use daily_market_tracker::api::{create_router, AppState};
use daily_market_tracker::pipeline::Pipeline;
use daily_market_tracker::snapshot::NormalizerRules;
use daily_market_tracker::sources::types::{FetchError, SourceRecord};
use daily_market_tracker::sources::{FetchPolicy, RegisteredAdapter, SourceAdapter};
use daily_market_tracker::store::HistoryStore;

struct EmptyAdapter;

#[async_trait::async_trait]
impl SourceAdapter for EmptyAdapter {
    async fn fetch(&self) -> Result<Vec<SourceRecord>, FetchError> {
        Ok(vec![])
    }
    fn name(&self) -> &'static str {
        "social"
    }
}

fn test_state(dir: &tempfile::TempDir) -> AppState {
    let store = Arc::new(HistoryStore::open(dir.path().join("h.jsonl")).unwrap());
    let pipeline = Arc::new(Pipeline::new(
        vec![RegisteredAdapter::new(
            Arc::new(EmptyAdapter),
            FetchPolicy {
                timeout: Duration::from_millis(100),
                max_attempts: 1,
                backoff: Duration::from_millis(1),
            },
        )],
        NormalizerRules::default(),
        Duration::from_secs(2),
        store,
    ));
    AppState::new(pipeline)
}

#[tokio::test]
async fn health_endpoint_responds() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn latest_report_is_404_before_any_run() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));
    let resp = app
        .oneshot(Request::get("/report/latest").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn run_now_then_latest_report_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);

    let resp = create_router(state.clone())
        .oneshot(Request::post("/run").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let summary: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(summary["health"], "complete");
    assert!(summary["archived"].is_string());

    let resp = create_router(state)
        .oneshot(Request::get("/report/latest").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let report: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(report["text"]
        .as_str()
        .unwrap()
        .contains("Daily Market Report"));
}
