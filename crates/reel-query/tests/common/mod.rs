#![allow(dead_code)]

use std::sync::Arc;

use bson::{Bson, DateTime, Document, doc};
use chrono::NaiveDate;
use reel_query::{MOVIES_B, QueryRegistry, REVIEWS_A, REVIEWS_B, USERS_B};
use reel_store::{DocumentStore, MemoryStore};

pub struct Movie {
    pub id: &'static str,
    pub title: &'static str,
    pub year: i32,
    pub genres: &'static [&'static str],
}

pub struct Review {
    pub id: &'static str,
    pub movie: &'static str,
    pub user: &'static str,
    pub rating: i32,
    pub date: &'static str,
    pub helpful: i32,
    pub total: i32,
    pub content: &'static str,
}

pub const MOVIES: &[Movie] = &[
    Movie { id: "m1", title: "Inception", year: 2010, genres: &["Sci-Fi", "Thriller"] },
    Movie { id: "m2", title: "The Dark Knight", year: 2008, genres: &["Action", "Crime", "Drama"] },
    Movie { id: "m3", title: "Heat", year: 1995, genres: &["Crime", "Drama"] },
];

pub const USERS: &[(&str, &str)] = &[("u1", "ann"), ("u2", "bob"), ("u3", "cy"), ("user123", "dee")];

pub const REVIEWS: &[Review] = &[
    Review { id: "r1", movie: "m1", user: "u1", rating: 10, date: "2021-03-05", helpful: 8, total: 10, content: "Great acting and a great plot" },
    Review { id: "r2", movie: "m1", user: "u2", rating: 9, date: "2021-03-20", helpful: 3, total: 4, content: "Mind bending story" },
    Review { id: "r3", movie: "m1", user: "u3", rating: 8, date: "2021-07-11", helpful: 0, total: 0, content: "Good acting overall" },
    Review { id: "r4", movie: "m1", user: "user123", rating: 9, date: "2022-01-02", helpful: 12, total: 15, content: "Great visuals" },
    Review { id: "r5", movie: "m1", user: "u2", rating: 9, date: "2022-01-30", helpful: 5, total: 12, content: "Still great on rewatch" },
    Review { id: "r6", movie: "m2", user: "u1", rating: 10, date: "2020-05-01", helpful: 20, total: 22, content: "Great acting by the whole cast" },
    Review { id: "r7", movie: "m2", user: "user123", rating: 7, date: "2021-03-05", helpful: 1, total: 11, content: "Too long" },
    Review { id: "r8", movie: "m2", user: "u3", rating: 6, date: "2023-06-30", helpful: 2, total: 3, content: "Fine acting" },
    Review { id: "r9", movie: "m2", user: "u2", rating: 9, date: "2020-05-01", helpful: 10, total: 10, content: "Iconic villain" },
    Review { id: "r10", movie: "m3", user: "u1", rating: 3, date: "2019-12-31", helpful: 0, total: 2, content: "Dated" },
    Review { id: "r11", movie: "m3", user: "user123", rating: 8, date: "2022-08-08", helpful: 4, total: 10, content: "great heist" },
    Review { id: "r12", movie: "m3", user: "u1", rating: 2, date: "2023-12-31", helpful: 1, total: 1, content: "Boring" },
];

fn date(raw: &str) -> Bson {
    let at = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc();
    Bson::DateTime(DateTime::from_millis(at.timestamp_millis()))
}

fn movie(id: &str) -> &'static Movie {
    MOVIES.iter().find(|m| m.id == id).unwrap()
}

fn username(id: &str) -> &'static str {
    USERS.iter().find(|(u, _)| *u == id).unwrap().1
}

fn review_fields(r: &Review) -> Document {
    doc! {
        "rating": r.rating,
        "review_title": "Verdict",
        "review_content": r.content,
        "review_date": date(r.date),
        "helpful_votes": r.helpful,
        "total_votes": r.total,
    }
}

pub fn embedded_docs() -> Vec<Document> {
    REVIEWS
        .iter()
        .map(|r| {
            let m = movie(r.movie);
            let mut d = doc! {
                "_id": r.id,
                "movie": { "id": m.id, "title": m.title, "year": m.year, "genres": m.genres.to_vec() },
                "user": { "id": r.user, "name": username(r.user) },
            };
            d.extend(review_fields(r));
            d
        })
        .collect()
}

pub fn seed_embedded(store: &dyn DocumentStore) {
    store.insert_many(REVIEWS_A, embedded_docs()).unwrap();
}

pub fn seed_normalized(store: &dyn DocumentStore) {
    let movies = MOVIES
        .iter()
        .map(|m| doc! { "_id": m.id, "title": m.title, "year": m.year, "genres": m.genres.to_vec() })
        .collect();
    let users = USERS
        .iter()
        .map(|(id, name)| doc! { "_id": *id, "name": *name })
        .collect();
    let reviews = REVIEWS
        .iter()
        .map(|r| {
            let mut d = doc! { "_id": r.id, "movie_id": r.movie, "user_id": r.user };
            d.extend(review_fields(r));
            d
        })
        .collect();
    store.insert_many(MOVIES_B, movies).unwrap();
    store.insert_many(USERS_B, users).unwrap();
    store.insert_many(REVIEWS_B, reviews).unwrap();
}

/// A store holding the same reviews in both layouts.
pub fn seeded_registry() -> QueryRegistry {
    let store = Arc::new(MemoryStore::new());
    seed_embedded(store.as_ref());
    seed_normalized(store.as_ref());
    QueryRegistry::new(store)
}

pub fn ids(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .map(|d| match d.get("_id") {
            Some(Bson::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        })
        .collect()
}
