use std::sync::Arc;

use bson::{Bson, Document, doc};
use reel_store::{DocumentStore, FindOptions, StoreError};
use tracing::debug;

use super::{
    QueryBackend, at_least_one, date, distribution_stages, helpful_stages, monthly_stages,
    newest_first, review_row_fields, title_pattern,
};
use crate::params::{
    ActiveReviewersParams, ColdStartParams, HelpfulMoviesParams, LatestReviewsParams,
    MonthlyTrendParams, RatingDistributionParams, RatingRangeParams, TextSearchParams,
    TopRatedParams, UserRef, UserReviewsParams,
};
use crate::variant::{MOVIES_B, REVIEWS_B, SchemaVariant, USERS_B};

/// Model B: reviews reference movies and users by id.
pub struct NormalizedBackend {
    store: Arc<dyn DocumentStore>,
}

impl NormalizedBackend {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Ids of every document in `collection` matching `filter`.
    fn resolve_ids(&self, collection: &str, filter: Document) -> Result<Vec<Bson>, StoreError> {
        let docs = self.store.find(
            collection,
            FindOptions::filter(filter).projection(doc! { "_id": 1 }),
        )?;
        Ok(docs.into_iter().filter_map(|mut d| d.remove("_id")).collect())
    }

    fn movies_titled(&self, title: &str) -> Result<Vec<Bson>, StoreError> {
        let ids = self.resolve_ids(MOVIES_B, doc! { "title": title_pattern(title) })?;
        if ids.is_empty() {
            debug!(title, "no movie matches title");
        }
        Ok(ids)
    }

    fn review_rows(&self, filter: Document, limit: usize) -> Result<Vec<Document>, StoreError> {
        self.store.find(
            REVIEWS_B,
            FindOptions::filter(filter)
                .projection(review_row_fields("$movie_id".into(), "$user_id".into()))
                .sort(newest_first())
                .limit(limit),
        )
    }
}

fn join_reviews(local_field: &str, foreign_field: &str) -> Document {
    doc! { "$lookup": {
        "from": REVIEWS_B,
        "localField": local_field,
        "foreignField": foreign_field,
        "as": "reviews",
    } }
}

impl QueryBackend for NormalizedBackend {
    fn variant(&self) -> SchemaVariant {
        SchemaVariant::B
    }

    fn latest_reviews(&self, params: &LatestReviewsParams) -> Result<Vec<Document>, StoreError> {
        let movies = self.movies_titled(&params.title)?;
        if movies.is_empty() {
            return Ok(Vec::new());
        }
        self.review_rows(doc! { "movie_id": { "$in": movies } }, params.limit)
    }

    fn user_reviews(&self, params: &UserReviewsParams) -> Result<Vec<Document>, StoreError> {
        let filter = match &params.user {
            UserRef::Id(id) => doc! { "user_id": id.as_str() },
            UserRef::Name(name) => {
                let users = self.resolve_ids(USERS_B, doc! { "name": name.as_str() })?;
                if users.is_empty() {
                    debug!(username = %name, "no user with this name");
                    return Ok(Vec::new());
                }
                doc! { "user_id": { "$in": users } }
            }
        };
        self.review_rows(filter, params.limit)
    }

    fn rating_range(&self, params: &RatingRangeParams) -> Result<Vec<Document>, StoreError> {
        self.review_rows(
            doc! {
                "rating": { "$gte": params.min_rating },
                "review_date": { "$gte": date(params.start), "$lte": date(params.end) },
            },
            params.limit,
        )
    }

    fn top_rated(&self, params: &TopRatedParams) -> Result<Vec<Document>, StoreError> {
        self.store.aggregate(
            MOVIES_B,
            &[
                join_reviews("_id", "movie_id"),
                doc! { "$project": {
                    "_id": "$title",
                    "avgRating": { "$avg": "$reviews.rating" },
                    "numReviews": { "$size": "$reviews" },
                } },
                doc! { "$match": { "numReviews": { "$gte": at_least_one(params.min_reviews) } } },
                doc! { "$sort": { "avgRating": -1, "numReviews": -1, "_id": 1 } },
                doc! { "$limit": params.limit as i64 },
            ],
        )
    }

    fn active_reviewers(
        &self,
        params: &ActiveReviewersParams,
    ) -> Result<Vec<Document>, StoreError> {
        self.store.aggregate(
            USERS_B,
            &[
                join_reviews("_id", "user_id"),
                doc! { "$project": {
                    "username": "$name",
                    "reviewCount": { "$size": "$reviews" },
                } },
                doc! { "$match": { "reviewCount": { "$gte": 1 } } },
                doc! { "$sort": { "reviewCount": -1, "_id": 1 } },
                doc! { "$limit": params.limit as i64 },
            ],
        )
    }

    fn text_search(&self, params: &TextSearchParams) -> Result<Vec<Document>, StoreError> {
        let mut projection = review_row_fields("$movie_id".into(), "$user_id".into());
        projection.insert("score", doc! { "$meta": "textScore" });
        self.store.find(
            REVIEWS_B,
            FindOptions::filter(doc! { "$text": { "$search": params.search_text.as_str() } })
                .projection(projection)
                .sort(doc! { "score": { "$meta": "textScore" }, "rating": -1, "_id": 1 })
                .limit(params.limit),
        )
    }

    fn rating_distribution(
        &self,
        _params: &RatingDistributionParams,
    ) -> Result<Vec<Document>, StoreError> {
        let mut pipeline = vec![
            doc! { "$unwind": "$genres" },
            join_reviews("_id", "movie_id"),
            doc! { "$unwind": "$reviews" },
        ];
        pipeline.extend(distribution_stages("$genres", "$reviews.rating"));
        self.store.aggregate(MOVIES_B, &pipeline)
    }

    fn monthly_trend(&self, params: &MonthlyTrendParams) -> Result<Vec<Document>, StoreError> {
        let movies = self.movies_titled(&params.title)?;
        if movies.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipeline = vec![doc! { "$match": { "movie_id": { "$in": movies } } }];
        pipeline.extend(monthly_stages());
        self.store.aggregate(REVIEWS_B, &pipeline)
    }

    fn helpful_movies(&self, params: &HelpfulMoviesParams) -> Result<Vec<Document>, StoreError> {
        let mut pipeline = vec![
            doc! { "$match": { "total_votes": { "$gte": params.min_votes } } },
            doc! { "$lookup": {
                "from": MOVIES_B,
                "localField": "movie_id",
                "foreignField": "_id",
                "as": "movie",
            } },
            doc! { "$unwind": "$movie" },
        ];
        pipeline.extend(helpful_stages(params.limit));
        self.store.aggregate(REVIEWS_B, &pipeline)
    }

    fn cold_start(&self, params: &ColdStartParams) -> Result<Vec<Document>, StoreError> {
        self.store.aggregate(
            MOVIES_B,
            &[
                join_reviews("_id", "movie_id"),
                doc! { "$project": {
                    "_id": { "title": "$title", "year": "$year" },
                    "avgRating": { "$avg": "$reviews.rating" },
                    "numReviews": { "$size": "$reviews" },
                } },
                doc! { "$match": {
                    "numReviews": { "$gte": at_least_one(params.min_reviews) },
                    "avgRating": { "$gte": params.min_rating },
                } },
                doc! { "$sort": { "_id.year": -1, "avgRating": -1, "_id.title": 1 } },
                doc! { "$limit": params.limit as i64 },
            ],
        )
    }
}
