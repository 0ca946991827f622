use std::collections::HashMap;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use bson::Bson;
use chrono::{DateTime, Utc};
use reel_query::{QueryError, QueryId, QueryParams, SchemaVariant};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_ms: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub docs_returned: usize,
    pub data: Vec<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub success: bool,
    pub query_id: QueryId,
    pub model: SchemaVariant,
    pub timing: Timing,
    pub result: QueryResult,
}

/// `GET /api/v1/queries/{id}?model=A|B&…`. Every other query-string pair is
/// handed to the query as a parameter.
pub async fn execute(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(pairs): Query<HashMap<String, String>>,
) -> Result<Json<QueryResponse>, ApiError> {
    let model = pairs.get("model").map(String::as_str).unwrap_or_default();
    let variant: SchemaVariant = model.parse()?;
    let query_id: QueryId = id.parse()?;
    let params = QueryParams::from_pairs(query_id, &pairs)?;

    tokio::task::spawn_blocking(move || {
        let started_at = Utc::now();
        let started = Instant::now();
        let docs = state.registry.execute(query_id, variant, &params)?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let data: Vec<Value> = docs
            .into_iter()
            .map(|d| Bson::Document(d).into_relaxed_extjson())
            .collect();
        Ok::<_, QueryError>(Json(QueryResponse {
            success: true,
            query_id,
            model: variant,
            timing: Timing {
                started_at,
                ended_at: Utc::now(),
                elapsed_ms,
            },
            result: QueryResult {
                docs_returned: data.len(),
                data,
            },
        }))
    })
    .await?
    .map_err(ApiError::from)
}
