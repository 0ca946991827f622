use std::sync::Arc;

use bson::{Document, doc};
use reel_store::{DocumentStore, FindOptions, StoreError};

use super::{
    QueryBackend, date, distribution_stages, helpful_stages, monthly_stages, newest_first,
    review_row_fields, title_pattern,
};
use crate::params::{
    ActiveReviewersParams, ColdStartParams, HelpfulMoviesParams, LatestReviewsParams,
    MonthlyTrendParams, RatingDistributionParams, RatingRangeParams, TextSearchParams,
    TopRatedParams, UserRef, UserReviewsParams,
};
use crate::variant::{REVIEWS_A, SchemaVariant};

/// Model A: every review carries its movie and user.
pub struct EmbeddedBackend {
    store: Arc<dyn DocumentStore>,
}

impl EmbeddedBackend {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn review_rows(&self, filter: Document, limit: usize) -> Result<Vec<Document>, StoreError> {
        self.store.find(
            REVIEWS_A,
            FindOptions::filter(filter)
                .projection(review_row_fields("$movie.id".into(), "$user.id".into()))
                .sort(newest_first())
                .limit(limit),
        )
    }
}

impl QueryBackend for EmbeddedBackend {
    fn variant(&self) -> SchemaVariant {
        SchemaVariant::A
    }

    fn latest_reviews(&self, params: &LatestReviewsParams) -> Result<Vec<Document>, StoreError> {
        self.review_rows(
            doc! { "movie.title": title_pattern(&params.title) },
            params.limit,
        )
    }

    fn user_reviews(&self, params: &UserReviewsParams) -> Result<Vec<Document>, StoreError> {
        let filter = match &params.user {
            UserRef::Id(id) => doc! { "user.id": id.as_str() },
            UserRef::Name(name) => doc! { "user.name": name.as_str() },
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
            REVIEWS_A,
            &[
                doc! { "$group": {
                    "_id": "$movie.title",
                    "avgRating": { "$avg": "$rating" },
                    "numReviews": { "$sum": 1 },
                } },
                doc! { "$match": { "numReviews": { "$gte": params.min_reviews } } },
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
            REVIEWS_A,
            &[
                doc! { "$group": {
                    "_id": "$user.id",
                    "username": { "$first": "$user.name" },
                    "reviewCount": { "$sum": 1 },
                } },
                doc! { "$sort": { "reviewCount": -1, "_id": 1 } },
                doc! { "$limit": params.limit as i64 },
            ],
        )
    }

    fn text_search(&self, params: &TextSearchParams) -> Result<Vec<Document>, StoreError> {
        let mut projection = review_row_fields("$movie.id".into(), "$user.id".into());
        projection.insert("score", doc! { "$meta": "textScore" });
        self.store.find(
            REVIEWS_A,
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
        let mut pipeline = vec![doc! { "$unwind": "$movie.genres" }];
        pipeline.extend(distribution_stages("$movie.genres", "$rating"));
        self.store.aggregate(REVIEWS_A, &pipeline)
    }

    fn monthly_trend(&self, params: &MonthlyTrendParams) -> Result<Vec<Document>, StoreError> {
        let mut pipeline = vec![doc! { "$match": { "movie.title": title_pattern(&params.title) } }];
        pipeline.extend(monthly_stages());
        self.store.aggregate(REVIEWS_A, &pipeline)
    }

    fn helpful_movies(&self, params: &HelpfulMoviesParams) -> Result<Vec<Document>, StoreError> {
        let mut pipeline = vec![doc! { "$match": { "total_votes": { "$gte": params.min_votes } } }];
        pipeline.extend(helpful_stages(params.limit));
        self.store.aggregate(REVIEWS_A, &pipeline)
    }

    fn cold_start(&self, params: &ColdStartParams) -> Result<Vec<Document>, StoreError> {
        self.store.aggregate(
            REVIEWS_A,
            &[
                doc! { "$group": {
                    "_id": { "title": "$movie.title", "year": "$movie.year" },
                    "avgRating": { "$avg": "$rating" },
                    "numReviews": { "$sum": 1 },
                } },
                doc! { "$match": {
                    "numReviews": { "$gte": params.min_reviews },
                    "avgRating": { "$gte": params.min_rating },
                } },
                doc! { "$sort": { "_id.year": -1, "avgRating": -1, "_id.title": 1 } },
                doc! { "$limit": params.limit as i64 },
            ],
        )
    }
}
