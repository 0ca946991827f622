use std::collections::HashMap;
use std::sync::Arc;

use bson::Document;
use reel_store::DocumentStore;
use tracing::debug;

use crate::backend::{EmbeddedBackend, NormalizedBackend, QueryBackend};
use crate::error::QueryError;
use crate::params::QueryParams;
use crate::query_id::QueryId;
use crate::variant::SchemaVariant;

/// Runs any registered query against either schema layout.
pub struct QueryRegistry {
    store: Arc<dyn DocumentStore>,
    embedded: EmbeddedBackend,
    normalized: NormalizedBackend,
}

impl QueryRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            embedded: EmbeddedBackend::new(Arc::clone(&store)),
            normalized: NormalizedBackend::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn backend(&self, variant: SchemaVariant) -> &dyn QueryBackend {
        match variant {
            SchemaVariant::A => &self.embedded,
            SchemaVariant::B => &self.normalized,
        }
    }

    /// Execute `id` on `variant`. `params` must belong to the same query.
    pub fn execute(
        &self,
        id: QueryId,
        variant: SchemaVariant,
        params: &QueryParams,
    ) -> Result<Vec<Document>, QueryError> {
        if params.id() != id {
            return Err(QueryError::params(
                id,
                format!("parameters were built for {}", params.id()),
            ));
        }
        debug!(query = %id, model = %variant, "executing query");

        let backend = self.backend(variant);
        let docs = match params {
            QueryParams::LatestReviews(p) => backend.latest_reviews(p),
            QueryParams::UserReviews(p) => backend.user_reviews(p),
            QueryParams::RatingRange(p) => backend.rating_range(p),
            QueryParams::TopRated(p) => backend.top_rated(p),
            QueryParams::ActiveReviewers(p) => backend.active_reviewers(p),
            QueryParams::TextSearch(p) => backend.text_search(p),
            QueryParams::RatingDistribution(p) => backend.rating_distribution(p),
            QueryParams::MonthlyTrend(p) => backend.monthly_trend(p),
            QueryParams::HelpfulMovies(p) => backend.helpful_movies(p),
            QueryParams::ColdStart(p) => backend.cold_start(p),
        }?;
        Ok(docs)
    }

    /// Parse the id, variant and flat parameters, then execute.
    pub fn execute_raw(
        &self,
        id: &str,
        variant: &str,
        pairs: &HashMap<String, String>,
    ) -> Result<Vec<Document>, QueryError> {
        let variant: SchemaVariant = variant.parse()?;
        let id: QueryId = id.parse()?;
        let params = QueryParams::from_pairs(id, pairs)?;
        self.execute(id, variant, &params)
    }
}
