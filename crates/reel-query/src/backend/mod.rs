//! One capability interface, two schema shapes.
//!
//! Both backends return the same document shapes in the same order for
//! equivalent data, so callers never need to know which layout answered.

mod embedded;
mod normalized;

pub use embedded::EmbeddedBackend;
pub use normalized::NormalizedBackend;

use bson::{Bson, Document, doc};
use chrono::{DateTime, Utc};
use reel_store::StoreError;

use crate::params::{
    ActiveReviewersParams, ColdStartParams, HelpfulMoviesParams, LatestReviewsParams,
    MonthlyTrendParams, RatingDistributionParams, RatingRangeParams, TextSearchParams,
    TopRatedParams, UserReviewsParams,
};
use crate::variant::SchemaVariant;

pub trait QueryBackend: Send + Sync {
    fn variant(&self) -> SchemaVariant;

    /// Q1: review rows, newest first.
    fn latest_reviews(&self, params: &LatestReviewsParams) -> Result<Vec<Document>, StoreError>;
    /// Q2: review rows, newest first.
    fn user_reviews(&self, params: &UserReviewsParams) -> Result<Vec<Document>, StoreError>;
    /// Q3: review rows, newest first.
    fn rating_range(&self, params: &RatingRangeParams) -> Result<Vec<Document>, StoreError>;
    /// Q4: `{ _id: title, avgRating, numReviews }`.
    fn top_rated(&self, params: &TopRatedParams) -> Result<Vec<Document>, StoreError>;
    /// Q5: `{ _id: userId, username, reviewCount }`.
    fn active_reviewers(&self, params: &ActiveReviewersParams)
    -> Result<Vec<Document>, StoreError>;
    /// Q6: review rows plus `score`, most relevant first.
    fn text_search(&self, params: &TextSearchParams) -> Result<Vec<Document>, StoreError>;
    /// Q7: `{ _id: genre, distribution: [{ bucket, count }] }`.
    fn rating_distribution(
        &self,
        params: &RatingDistributionParams,
    ) -> Result<Vec<Document>, StoreError>;
    /// Q8: `{ _id: { year, month }, count, avgRating }`.
    fn monthly_trend(&self, params: &MonthlyTrendParams) -> Result<Vec<Document>, StoreError>;
    /// Q9: `{ _id: title, avgRating, helpfulnessScore }`.
    fn helpful_movies(&self, params: &HelpfulMoviesParams) -> Result<Vec<Document>, StoreError>;
    /// Q10: `{ _id: { title, year }, avgRating, numReviews }`.
    fn cold_start(&self, params: &ColdStartParams) -> Result<Vec<Document>, StoreError>;
}

/// Newest first; `_id` breaks ties.
pub(crate) fn newest_first() -> Document {
    doc! { "review_date": -1, "_id": 1 }
}

/// Case-insensitive partial title match, with the title taken literally.
pub(crate) fn title_pattern(title: &str) -> Document {
    doc! { "$regex": regex::escape(title), "$options": "i" }
}

pub(crate) fn date(value: DateTime<Utc>) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(value.timestamp_millis()))
}

/// Review fields every review row carries, for a review stored with its
/// movie and user references at `movie_id` / `user_id`.
pub(crate) fn review_row_fields(movie_id: Bson, user_id: Bson) -> Document {
    doc! {
        "movie_id": movie_id,
        "user_id": user_id,
        "rating": 1,
        "review_title": 1,
        "review_content": 1,
        "review_date": 1,
        "helpful_votes": 1,
        "total_votes": 1,
    }
}

/// Five two-point rating buckets.
pub(crate) fn rating_bucket(rating: &str) -> Bson {
    let branches: Vec<Bson> = [(2, "0-2"), (4, "2-4"), (6, "4-6"), (8, "6-8"), (10, "8-10")]
        .into_iter()
        .map(|(upper, label)| {
            Bson::Document(doc! { "case": { "$lte": [rating, upper] }, "then": label })
        })
        .collect();
    Bson::Document(doc! { "$switch": { "branches": branches, "default": "invalid" } })
}

/// Helpful votes over total votes, zero when nobody voted.
fn helpfulness(helpful: &str, total: &str) -> Bson {
    Bson::Document(doc! {
        "$cond": [
            { "$eq": [total, 0] },
            0.0,
            { "$divide": [helpful, total] },
        ]
    })
}

/// Q7 tail: per-genre histograms, genres and buckets in ascending order.
pub(crate) fn distribution_stages(genre: &str, rating: &str) -> Vec<Document> {
    vec![
        doc! { "$group": {
            "_id": { "genre": genre, "bucket": rating_bucket(rating) },
            "count": { "$sum": 1 },
        } },
        doc! { "$sort": { "_id.genre": 1, "_id.bucket": 1 } },
        doc! { "$group": {
            "_id": "$_id.genre",
            "distribution": { "$push": { "bucket": "$_id.bucket", "count": "$count" } },
        } },
        doc! { "$sort": { "_id": 1 } },
    ]
}

/// Q8 tail: monthly counts and averages in calendar order.
pub(crate) fn monthly_stages() -> Vec<Document> {
    vec![
        doc! { "$group": {
            "_id": { "year": { "$year": "$review_date" }, "month": { "$month": "$review_date" } },
            "count": { "$sum": 1 },
            "avgRating": { "$avg": "$rating" },
        } },
        doc! { "$sort": { "_id.year": 1, "_id.month": 1 } },
    ]
}

/// Q9 tail over reviews carrying `movie.title`: helpfulness per movie.
pub(crate) fn helpful_stages(limit: usize) -> Vec<Document> {
    vec![
        doc! { "$group": {
            "_id": "$movie.title",
            "avgRating": { "$avg": "$rating" },
            "totalHelpfulVotes": { "$sum": "$helpful_votes" },
            "totalVotes": { "$sum": "$total_votes" },
        } },
        doc! { "$project": {
            "avgRating": 1,
            "helpfulnessScore": helpfulness("$totalHelpfulVotes", "$totalVotes"),
        } },
        doc! { "$sort": { "helpfulnessScore": -1, "avgRating": -1, "_id": 1 } },
        doc! { "$limit": limit as i64 },
    ]
}

/// Review-count floor for aggregates built from a join. Movies and users
/// without reviews do not exist in the embedded layout.
pub(crate) fn at_least_one(floor: i64) -> i64 {
    floor.max(1)
}
