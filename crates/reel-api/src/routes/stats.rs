use axum::Json;
use axum::extract::State;
use bson::{Bson, doc};
use chrono::{DateTime, Utc};
use reel_query::{QueryError, SchemaVariant};
use reel_store::{DocumentStore, StoreError};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct IndexStats {
    pub name: String,
    pub keys: Value,
    pub unique: bool,
    pub sparse: bool,
}

#[derive(Serialize)]
pub struct CollectionStats {
    pub name: String,
    pub documents: u64,
    pub indexes: Vec<IndexStats>,
}

#[derive(Serialize)]
pub struct ModelStats {
    pub model: SchemaVariant,
    pub collections: Vec<CollectionStats>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub models: Vec<ModelStats>,
}

fn collection_stats(store: &dyn DocumentStore, name: &str) -> Result<CollectionStats, StoreError> {
    let indexes = match store.list_indexes(name) {
        Ok(models) => models,
        Err(StoreError::NamespaceNotFound(_)) => Vec::new(),
        Err(e) => return Err(e),
    };
    Ok(CollectionStats {
        name: name.to_string(),
        documents: store.count(name, &doc! {})?,
        indexes: indexes
            .into_iter()
            .map(|m| IndexStats {
                name: m.name(),
                keys: Bson::Document(m.keys).into_relaxed_extjson(),
                unique: m.options.unique,
                sparse: m.options.sparse,
            })
            .collect(),
    })
}

/// `GET /api/v1/stats`: document counts and indexes of every collection of
/// both models.
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    tokio::task::spawn_blocking(move || {
        let store = state.store.as_ref();
        let mut models = Vec::new();
        for variant in SchemaVariant::ALL {
            let collections = variant
                .collections()
                .iter()
                .map(|name| collection_stats(store, name))
                .collect::<Result<Vec<_>, _>>()?;
            models.push(ModelStats {
                model: variant,
                collections,
            });
        }
        Ok::<_, QueryError>(Json(StatsResponse {
            success: true,
            timestamp: Utc::now(),
            models,
        }))
    })
    .await?
    .map_err(ApiError::from)
}
