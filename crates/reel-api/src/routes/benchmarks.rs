use std::time::Instant;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use reel_bench::{BenchmarkHarness, BenchmarkReport, persist_report};
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkTiming {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub total_duration_ms: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResponse {
    pub success: bool,
    pub timing: BenchmarkTiming,
    pub results: BenchmarkReport,
    pub report_path: String,
}

/// `GET /api/v1/benchmarks`: run the full harness and persist the report.
pub async fn run(State(state): State<AppState>) -> Result<Json<BenchmarkResponse>, ApiError> {
    let guard = state.claim("benchmark")?;

    tokio::task::spawn_blocking(move || {
        let _guard = guard;
        let started_at = Utc::now();
        let started = Instant::now();

        let harness = BenchmarkHarness::new(state.registry.clone(), state.index_manager())
            .with_repetitions(state.config.repetitions);
        let report = harness.run()?;
        let path = persist_report(&state.config.report_dir, &report)?;

        let total_duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(total_duration_ms, path = %path.display(), "benchmark request complete");
        Ok(Json(BenchmarkResponse {
            success: true,
            timing: BenchmarkTiming {
                started_at,
                ended_at: Utc::now(),
                total_duration_ms,
            },
            results: report,
            report_path: path.display().to_string(),
        }))
    })
    .await?
}
