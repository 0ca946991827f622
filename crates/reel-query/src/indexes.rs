use std::sync::Arc;

use bson::doc;
use reel_store::{DocumentStore, IndexModel, StoreError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::variant::{MOVIES_B, REVIEWS_A, REVIEWS_B, SchemaVariant, USERS_B};

/// One declared index: where it lives and what it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub collection: &'static str,
    pub model: IndexModel,
}

impl IndexSpec {
    fn new(collection: &'static str, model: IndexModel) -> Self {
        Self { collection, model }
    }
}

/// The declared index set of a schema variant.
pub fn index_set(variant: SchemaVariant) -> Vec<IndexSpec> {
    match variant {
        SchemaVariant::A => vec![
            IndexSpec::new(REVIEWS_A, IndexModel::new(doc! { "movie.title": 1 })),
            IndexSpec::new(REVIEWS_A, IndexModel::new(doc! { "movie.id": 1 })),
            IndexSpec::new(REVIEWS_A, IndexModel::new(doc! { "user.id": 1 })),
            IndexSpec::new(REVIEWS_A, IndexModel::new(doc! { "rating": -1 })),
            IndexSpec::new(REVIEWS_A, IndexModel::new(doc! { "review_date": -1 })),
            IndexSpec::new(REVIEWS_A, IndexModel::new(doc! { "movie.genres": 1 })),
            IndexSpec::new(REVIEWS_A, IndexModel::new(doc! { "helpful_votes": -1 })),
            IndexSpec::new(REVIEWS_A, IndexModel::new(doc! { "total_votes": -1 })),
            IndexSpec::new(
                REVIEWS_A,
                IndexModel::new(doc! { "review_content": "text", "movie.title": "text" })
                    .weights(doc! { "review_content": 3, "movie.title": 2 }),
            ),
        ],
        SchemaVariant::B => vec![
            IndexSpec::new(REVIEWS_B, IndexModel::new(doc! { "movie_id": 1 })),
            IndexSpec::new(REVIEWS_B, IndexModel::new(doc! { "user_id": 1 })),
            IndexSpec::new(REVIEWS_B, IndexModel::new(doc! { "rating": -1 })),
            IndexSpec::new(REVIEWS_B, IndexModel::new(doc! { "review_date": -1 })),
            IndexSpec::new(REVIEWS_B, IndexModel::new(doc! { "helpful_votes": -1 })),
            IndexSpec::new(REVIEWS_B, IndexModel::new(doc! { "total_votes": -1 })),
            IndexSpec::new(
                REVIEWS_B,
                IndexModel::new(doc! { "movie_id": 1, "review_date": -1 }),
            ),
            IndexSpec::new(
                REVIEWS_B,
                IndexModel::new(doc! { "review_content": "text" })
                    .weights(doc! { "review_content": 1 }),
            ),
            IndexSpec::new(MOVIES_B, IndexModel::new(doc! { "title": 1 })),
            IndexSpec::new(MOVIES_B, IndexModel::new(doc! { "year": -1 })),
            IndexSpec::new(MOVIES_B, IndexModel::new(doc! { "genres": 1 })),
            IndexSpec::new(USERS_B, IndexModel::new(doc! { "name": 1 }).unique()),
        ],
    }
}

/// An index that could not be created for a reason other than already existing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexCreationWarning {
    pub collection: String,
    pub index: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
    pub warnings: Vec<IndexCreationWarning>,
}

/// A collection whose indexes could not be dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDropWarning {
    pub collection: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DropReport {
    pub dropped: usize,
    /// Collections that did not exist, so had nothing to drop.
    pub missing: Vec<String>,
    pub warnings: Vec<IndexDropWarning>,
}

/// Creates and drops each variant's declared indexes.
pub struct IndexManager {
    store: Arc<dyn DocumentStore>,
}

impl IndexManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Ensure every declared index of `variant` exists. Never fails: indexes
    /// that already exist are skipped, other failures become warnings and
    /// the remaining indexes are still attempted.
    pub fn create_indexes(&self, variant: SchemaVariant) -> IndexReport {
        let mut report = IndexReport::default();

        for spec in index_set(variant) {
            let name = spec.model.name();
            let present = self
                .store
                .list_indexes(spec.collection)
                .map(|existing| existing.iter().any(|m| m.name() == name))
                .unwrap_or(false);

            match self.store.create_index(spec.collection, spec.model) {
                Ok(name) if present => report.existing.push(name),
                Ok(name) => report.created.push(name),
                Err(e) if e.is_index_exists() => {
                    debug!(collection = spec.collection, index = %name, "index already exists");
                    report.existing.push(name);
                }
                Err(e) => {
                    warn!(collection = spec.collection, index = %name, error = %e, "index creation failed");
                    report.warnings.push(IndexCreationWarning {
                        collection: spec.collection.to_string(),
                        index: name,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            model = %variant,
            created = report.created.len(),
            existing = report.existing.len(),
            warnings = report.warnings.len(),
            "indexes ensured"
        );
        report
    }

    /// Drop every non-default index of every collection of `variant`. Never
    /// fails: a collection that refuses becomes a warning and the remaining
    /// collections are still dropped.
    pub fn drop_indexes(&self, variant: SchemaVariant) -> DropReport {
        let mut report = DropReport::default();

        for collection in variant.collections() {
            match self.store.drop_indexes(collection) {
                Ok(n) => report.dropped += n,
                Err(StoreError::NamespaceNotFound(_)) => {
                    debug!(collection, "no indexes to drop");
                    report.missing.push(collection.to_string());
                }
                Err(e) => {
                    warn!(collection, error = %e, "index drop failed");
                    report.warnings.push(IndexDropWarning {
                        collection: collection.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            model = %variant,
            dropped = report.dropped,
            warnings = report.warnings.len(),
            "indexes dropped"
        );
        report
    }

    /// Names of the indexes currently present on `variant`'s collections.
    pub fn present(&self, variant: SchemaVariant) -> Result<Vec<(String, String)>, StoreError> {
        let mut out = Vec::new();
        for collection in variant.collections() {
            match self.store.list_indexes(collection) {
                Ok(models) => out.extend(
                    models
                        .iter()
                        .map(|m| (collection.to_string(), m.name())),
                ),
                Err(StoreError::NamespaceNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}
