//! Raw review records and the cleaning rules applied to them.

use chrono::{DateTime, Utc};
use reel_query::parse_date;
use serde::{Deserialize, Serialize};

/// A number that may arrive as a JSON number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lenient {
    Number(f64),
    Text(String),
}

impl Lenient {
    fn number(&self) -> Option<f64> {
        match self {
            Lenient::Number(n) => Some(*n),
            Lenient::Text(s) => s.trim().parse().ok(),
        }
    }

    fn integer(&self) -> Option<i64> {
        self.number()
            .filter(|n| n.is_finite())
            .map(|n| n.trunc() as i64)
    }

    fn flag(&self) -> bool {
        match self {
            Lenient::Number(n) => *n != 0.0,
            Lenient::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        }
    }
}

/// A list given either as a comma-separated string or as an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListField {
    Items(Vec<String>),
    Text(String),
}

impl ListField {
    fn items(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            ListField::Items(items) => items.iter().map(String::as_str).collect(),
            ListField::Text(text) => text.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// One line of a review dataset, as found in the source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawReview {
    pub movie_id: Option<String>,
    pub movie_title: Option<String>,
    pub year: Option<Lenient>,
    pub genres: Option<ListField>,
    pub directors: Option<ListField>,
    pub stars: Option<ListField>,
    pub imdb_rating: Option<Lenient>,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub rating: Option<Lenient>,
    pub review_title: Option<String>,
    pub review_content: Option<String>,
    pub review_date: Option<String>,
    pub helpful_votes: Option<Lenient>,
    pub total_votes: Option<Lenient>,
    pub spoiler_tag: Option<Lenient>,
    pub verified_purchase: Option<Lenient>,
}

/// A review that passed cleaning. Identifiers are not resolved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanReview {
    pub movie_id: Option<String>,
    pub movie_title: String,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub stars: Vec<String>,
    pub imdb_rating: Option<f64>,
    pub user_id: Option<String>,
    pub username: String,
    pub rating: i32,
    pub review_title: String,
    pub review_content: String,
    pub review_date: DateTime<Utc>,
    pub helpful_votes: i32,
    pub total_votes: i32,
    pub spoiler_tag: bool,
    pub verified_purchase: bool,
}

/// Why a record was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingTitle,
    MissingContent,
    MissingUsername,
    InvalidRating,
    InvalidDate,
}

fn text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn list(value: &Option<ListField>) -> Vec<String> {
    value.as_ref().map(ListField::items).unwrap_or_default()
}

fn count(value: &Option<Lenient>) -> i32 {
    value
        .as_ref()
        .and_then(Lenient::integer)
        .and_then(|n| i32::try_from(n).ok())
        .filter(|n| *n >= 0)
        .unwrap_or(0)
}

impl RawReview {
    pub fn clean(&self) -> Result<CleanReview, Rejection> {
        let movie_title = text(&self.movie_title).ok_or(Rejection::MissingTitle)?;
        let review_content = text(&self.review_content).ok_or(Rejection::MissingContent)?;
        let username = text(&self.username).ok_or(Rejection::MissingUsername)?;

        let rating = self
            .rating
            .as_ref()
            .and_then(Lenient::integer)
            .filter(|r| (1..=10).contains(r))
            .ok_or(Rejection::InvalidRating)? as i32;

        let review_date = text(&self.review_date)
            .and_then(|raw| parse_date(&raw))
            .ok_or(Rejection::InvalidDate)?;

        let helpful_votes = count(&self.helpful_votes);
        let total_votes = count(&self.total_votes).max(helpful_votes);

        Ok(CleanReview {
            movie_id: text(&self.movie_id),
            movie_title,
            year: self
                .year
                .as_ref()
                .and_then(Lenient::integer)
                .and_then(|y| i32::try_from(y).ok()),
            genres: list(&self.genres),
            directors: list(&self.directors),
            stars: list(&self.stars),
            imdb_rating: self.imdb_rating.as_ref().and_then(Lenient::number),
            user_id: text(&self.user_id),
            username,
            rating,
            review_title: text(&self.review_title).unwrap_or_else(|| "No Title".to_string()),
            review_content,
            review_date,
            helpful_votes,
            total_votes,
            spoiler_tag: self.spoiler_tag.as_ref().is_some_and(Lenient::flag),
            verified_purchase: self.verified_purchase.as_ref().is_some_and(Lenient::flag),
        })
    }
}

impl CleanReview {
    /// Helpful votes over total votes; zero when nobody voted.
    pub fn helpfulness_ratio(&self) -> f64 {
        if self.total_votes > 0 {
            self.helpful_votes as f64 / self.total_votes as f64
        } else {
            0.0
        }
    }

    pub fn review_length(&self) -> i32 {
        self.review_content.chars().count() as i32
    }
}
