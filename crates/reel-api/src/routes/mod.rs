mod benchmarks;
mod health;
mod ingest;
mod queries;
mod stats;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health))
        .route("/api/v1/queries/{id}", get(queries::execute))
        .route("/api/v1/benchmarks", get(benchmarks::run))
        .route("/api/v1/ingest", post(ingest::run))
        .route("/api/v1/stats", get(stats::stats))
}
