use std::sync::Arc;
use std::time::Instant;

use bson::Document;
use reel_query::{IndexManager, MOVIES_B, REVIEWS_A, REVIEWS_B, SchemaVariant, USERS_B};
use reel_store::DocumentStore;
use serde::Serialize;
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::error::IngestError;
use crate::model::{embedded_documents, normalized_documents};

pub const BATCH_SIZE: usize = 1000;

/// Document counts after an ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IngestCounts {
    Embedded {
        reviews: u64,
        #[serde(rename = "uniqueMovies")]
        unique_movies: usize,
        #[serde(rename = "uniqueUsers")]
        unique_users: usize,
    },
    Normalized {
        reviews: u64,
        movies: u64,
        users: u64,
    },
}

fn insert_batched(
    store: &dyn DocumentStore,
    collection: &str,
    docs: Vec<Document>,
) -> Result<(), IngestError> {
    let total = docs.len().div_ceil(BATCH_SIZE);
    let mut docs = docs.into_iter().peekable();
    let mut batch_no = 0;
    while docs.peek().is_some() {
        let batch: Vec<Document> = docs.by_ref().take(BATCH_SIZE).collect();
        batch_no += 1;
        store.insert_many(collection, batch)?;
        debug!(collection, batch = batch_no, of = total, "inserted batch");
    }
    Ok(())
}

/// Replace `variant`'s collections with `dataset`, then ensure its indexes.
pub fn ingest(
    store: &Arc<dyn DocumentStore>,
    variant: SchemaVariant,
    dataset: &Dataset,
) -> Result<IngestCounts, IngestError> {
    let started = Instant::now();
    let everything = Document::new();
    for collection in variant.collections() {
        let removed = store.delete_many(collection, &everything)?;
        debug!(collection, removed, "cleared collection");
    }

    let counts = match variant {
        SchemaVariant::A => {
            insert_batched(store.as_ref(), REVIEWS_A, embedded_documents(dataset))?;
            IndexManager::new(Arc::clone(store)).create_indexes(variant);
            IngestCounts::Embedded {
                reviews: store.count(REVIEWS_A, &everything)?,
                unique_movies: store.distinct(REVIEWS_A, "movie.title")?.len(),
                unique_users: store.distinct(REVIEWS_A, "user.id")?.len(),
            }
        }
        SchemaVariant::B => {
            let docs = normalized_documents(dataset);
            insert_batched(store.as_ref(), MOVIES_B, docs.movies)?;
            insert_batched(store.as_ref(), USERS_B, docs.users)?;
            insert_batched(store.as_ref(), REVIEWS_B, docs.reviews)?;
            IndexManager::new(Arc::clone(store)).create_indexes(variant);
            IngestCounts::Normalized {
                reviews: store.count(REVIEWS_B, &everything)?,
                movies: store.count(MOVIES_B, &everything)?,
                users: store.count(USERS_B, &everything)?,
            }
        }
    };

    info!(
        model = %variant,
        elapsed_ms = started.elapsed().as_millis() as u64,
        ?counts,
        "ingestion complete"
    );
    Ok(counts)
}
