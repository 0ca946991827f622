use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Model A embeds movie and user data in each review.
pub const REVIEWS_A: &str = "reviews_a";
/// Model B keeps reviews, movies and users in separate collections.
pub const REVIEWS_B: &str = "reviews_b";
pub const MOVIES_B: &str = "movies_b";
pub const USERS_B: &str = "users_b";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVariant {
    A,
    B,
}

impl SchemaVariant {
    pub const ALL: [SchemaVariant; 2] = [SchemaVariant::A, SchemaVariant::B];

    /// Report key: `modelA` / `modelB`.
    pub fn model_key(self) -> &'static str {
        match self {
            SchemaVariant::A => "modelA",
            SchemaVariant::B => "modelB",
        }
    }

    pub fn collections(self) -> &'static [&'static str] {
        match self {
            SchemaVariant::A => &[REVIEWS_A],
            SchemaVariant::B => &[REVIEWS_B, MOVIES_B, USERS_B],
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVariant::A => f.write_str("A"),
            SchemaVariant::B => f.write_str("B"),
        }
    }
}

impl FromStr for SchemaVariant {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "a" | "A" => Ok(SchemaVariant::A),
            "b" | "B" => Ok(SchemaVariant::B),
            other => Err(QueryError::InvalidVariant(other.to_string())),
        }
    }
}
