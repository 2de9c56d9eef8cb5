// src/api.rs
//! Operator surface. The pipeline has no scheduler of its own beyond the
//! interval task; these routes are how an external operator triggers a run
//! and reads the latest product.

use std::sync::{Arc, RwLock};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::pipeline::Pipeline;
use crate::report::RenderedReport;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub last_report: Arc<RwLock<Option<RenderedReport>>>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            last_report: Arc::new(RwLock::new(None)),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/report/latest", get(latest_report))
        .route("/run", post(run_now))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn latest_report(
    State(state): State<AppState>,
) -> Result<Json<RenderedReport>, StatusCode> {
    let guard = state.last_report.read().expect("last report lock poisoned");
    match guard.as_ref() {
        Some(report) => Ok(Json(report.clone())),
        None => Err(StatusCode::NOT_FOUND),
    }
}

#[derive(serde::Serialize)]
struct RunSummary {
    generated_at: chrono::DateTime<chrono::Utc>,
    health: crate::snapshot::Health,
    archived: Option<String>,
}

async fn run_now(State(state): State<AppState>) -> Json<RunSummary> {
    let report = state.pipeline.run_snapshot_cycle().await;
    let summary = RunSummary {
        generated_at: report.generated_at,
        health: report.health,
        archived: report.archived.clone(),
    };
    *state.last_report.write().expect("last report lock poisoned") = Some(report);
    Json(summary)
}
