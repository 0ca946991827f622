//! Shape a dataset into Model A and Model B documents.

use std::collections::HashMap;

use bson::{Bson, Document, doc};
use chrono::{DateTime, Utc};

use crate::dataset::{Dataset, Review};

fn date(value: DateTime<Utc>) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(value.timestamp_millis()))
}

fn optional<T: Into<Bson>>(value: Option<T>) -> Bson {
    value.map(Into::into).unwrap_or(Bson::Null)
}

/// Fields every review carries in both models.
fn review_fields(review: &Review) -> Document {
    let r = &review.data;
    doc! {
        "rating": r.rating,
        "review_title": r.review_title.as_str(),
        "review_content": r.review_content.as_str(),
        "review_date": date(r.review_date),
        "helpful_votes": r.helpful_votes,
        "total_votes": r.total_votes,
        "helpfulness_ratio": r.helpfulness_ratio(),
        "spoiler_tag": r.spoiler_tag,
        "verified_purchase": r.verified_purchase,
        "review_length": r.review_length(),
    }
}

fn movie_fields(review: &Review) -> Document {
    let r = &review.data;
    doc! {
        "title": r.movie_title.as_str(),
        "year": optional(r.year),
        "genres": r.genres.clone(),
        "directors": r.directors.clone(),
        "stars": r.stars.clone(),
        "imdb_rating": optional(r.imdb_rating),
    }
}

/// First review seen for each movie id. Both models describe a movie from
/// this row, so rows that disagree on year or genres cannot split it.
fn canonical_movies(dataset: &Dataset) -> HashMap<&str, &Review> {
    let mut first = HashMap::new();
    for review in &dataset.reviews {
        first.entry(review.movie_id.as_str()).or_insert(review);
    }
    first
}

/// Model A: one document per review with the movie and user embedded.
pub fn embedded_documents(dataset: &Dataset) -> Vec<Document> {
    let canonical = canonical_movies(dataset);
    dataset
        .reviews
        .iter()
        .map(|review| {
            let source = canonical
                .get(review.movie_id.as_str())
                .copied()
                .unwrap_or(review);
            let mut movie = doc! { "id": review.movie_id.as_str() };
            for (key, value) in movie_fields(source) {
                movie.insert(key, value);
            }
            let mut out = doc! {
                "_id": review.id.as_str(),
                "movie": movie,
                "user": { "id": review.user_id.as_str(), "name": review.data.username.as_str() },
            };
            for (key, value) in review_fields(review) {
                out.insert(key, value);
            }
            out
        })
        .collect()
}

/// Running per-movie or per-user review statistics.
#[derive(Debug, Clone)]
struct Stats {
    total_reviews: i64,
    rating_sum: i64,
    distribution: [i64; 10],
    helpful_votes: i64,
    total_votes: i64,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
}

impl Stats {
    fn new(review: &Review) -> Self {
        Self {
            total_reviews: 0,
            rating_sum: 0,
            distribution: [0; 10],
            helpful_votes: 0,
            total_votes: 0,
            first: review.data.review_date,
            last: review.data.review_date,
        }
    }

    fn add(&mut self, review: &Review) {
        let r = &review.data;
        self.total_reviews += 1;
        self.rating_sum += r.rating as i64;
        if let Some(slot) = usize::try_from(r.rating - 1)
            .ok()
            .and_then(|i| self.distribution.get_mut(i))
        {
            *slot += 1;
        }
        self.helpful_votes += r.helpful_votes as i64;
        self.total_votes += r.total_votes as i64;
        self.first = self.first.min(r.review_date);
        self.last = self.last.max(r.review_date);
    }

    fn fields(&self) -> Document {
        let mut distribution = Document::new();
        for (i, n) in self.distribution.iter().enumerate() {
            distribution.insert((i + 1).to_string(), *n);
        }
        doc! {
            "total_reviews": self.total_reviews,
            "average_rating": self.rating_sum as f64 / self.total_reviews as f64,
            "rating_distribution": distribution,
            "total_helpful_votes": self.helpful_votes,
            "total_votes": self.total_votes,
            "helpfulness_ratio": if self.total_votes > 0 {
                self.helpful_votes as f64 / self.total_votes as f64
            } else {
                0.0
            },
            "first_review_date": date(self.first),
            "last_review_date": date(self.last),
        }
    }
}

/// Accumulates one entry per key, in first-appearance order.
struct Tally {
    order: Vec<String>,
    entries: HashMap<String, (Document, Stats)>,
}

impl Tally {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }

    fn add(&mut self, id: &str, review: &Review, base: impl FnOnce() -> Document) {
        let (_, stats) = self.entries.entry(id.to_string()).or_insert_with(|| {
            self.order.push(id.to_string());
            (base(), Stats::new(review))
        });
        stats.add(review);
    }

    fn documents(mut self) -> Vec<Document> {
        self.order
            .iter()
            .filter_map(|id| self.entries.remove(id))
            .map(|(mut base, stats)| {
                for (key, value) in stats.fields() {
                    base.insert(key, value);
                }
                base
            })
            .collect()
    }
}

/// Model B collections, ready to insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedDocuments {
    pub reviews: Vec<Document>,
    pub movies: Vec<Document>,
    pub users: Vec<Document>,
}

/// Model B: reviews reference their movie and user; movies and users carry
/// aggregate statistics over their reviews.
pub fn normalized_documents(dataset: &Dataset) -> NormalizedDocuments {
    let mut movies = Tally::new();
    let mut users = Tally::new();
    let mut reviews = Vec::with_capacity(dataset.len());

    for review in &dataset.reviews {
        movies.add(&review.movie_id, review, || {
            let mut base = doc! { "_id": review.movie_id.as_str() };
            for (key, value) in movie_fields(review) {
                base.insert(key, value);
            }
            base
        });
        users.add(&review.user_id, review, || {
            doc! { "_id": review.user_id.as_str(), "name": review.data.username.as_str() }
        });

        let mut out = doc! {
            "_id": review.id.as_str(),
            "movie_id": review.movie_id.as_str(),
            "user_id": review.user_id.as_str(),
        };
        for (key, value) in review_fields(review) {
            out.insert(key, value);
        }
        reviews.push(out);
    }

    NormalizedDocuments {
        reviews,
        movies: movies.documents(),
        users: users.documents(),
    }
}
