use std::collections::HashMap;
use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use reel_ingest::{IngestCounts, ingest};
use reel_query::SchemaVariant;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub model: SchemaVariant,
    /// Milliseconds.
    pub duration: f64,
    pub counts: IngestCounts,
}

/// `POST /api/v1/ingest?model=A|B`: reload one model from the configured
/// dataset.
pub async fn run(
    State(state): State<AppState>,
    Query(pairs): Query<HashMap<String, String>>,
) -> Result<Json<IngestResponse>, ApiError> {
    let model = pairs.get("model").map(String::as_str).unwrap_or_default();
    let variant: SchemaVariant = model.parse()?;
    let guard = state.claim("ingestion")?;

    tokio::task::spawn_blocking(move || {
        let _guard = guard;
        let started = Instant::now();
        let dataset = state.config.dataset.load()?;
        let counts = ingest(&state.store, variant, &dataset)?;
        Ok(Json(IngestResponse {
            success: true,
            model: variant,
            duration: started.elapsed().as_secs_f64() * 1000.0,
            counts,
        }))
    })
    .await?
}
