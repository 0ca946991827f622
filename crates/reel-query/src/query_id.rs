use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// The ten registered queries, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueryId {
    Q1,
    Q2,
    Q3,
    Q4,
    Q5,
    Q6,
    Q7,
    Q8,
    Q9,
    Q10,
}

impl QueryId {
    pub const ALL: [QueryId; 10] = [
        QueryId::Q1,
        QueryId::Q2,
        QueryId::Q3,
        QueryId::Q4,
        QueryId::Q5,
        QueryId::Q6,
        QueryId::Q7,
        QueryId::Q8,
        QueryId::Q9,
        QueryId::Q10,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryId::Q1 => "Q1",
            QueryId::Q2 => "Q2",
            QueryId::Q3 => "Q3",
            QueryId::Q4 => "Q4",
            QueryId::Q5 => "Q5",
            QueryId::Q6 => "Q6",
            QueryId::Q7 => "Q7",
            QueryId::Q8 => "Q8",
            QueryId::Q9 => "Q9",
            QueryId::Q10 => "Q10",
        }
    }

    pub fn intent(self) -> &'static str {
        match self {
            QueryId::Q1 => "latest reviews for a movie title",
            QueryId::Q2 => "all reviews by a user",
            QueryId::Q3 => "reviews rated at least X within a date range",
            QueryId::Q4 => "top movies by average rating with a review floor",
            QueryId::Q5 => "most active reviewers",
            QueryId::Q6 => "full-text search over reviews, ranked by relevance",
            QueryId::Q7 => "rating distribution per genre",
            QueryId::Q8 => "monthly review trend for a movie",
            QueryId::Q9 => "top movies by helpfulness ratio with a vote floor",
            QueryId::Q10 => "cold-start discovery: few reviews, high average",
        }
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryId {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QueryError::UnknownQuery(s.to_string()))
    }
}
