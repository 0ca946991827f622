use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::QueryError;
use crate::query_id::QueryId;

#[derive(Debug, Clone, PartialEq)]
pub struct LatestReviewsParams {
    /// Case-insensitive partial title match.
    pub title: String,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserRef {
    Id(String),
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserReviewsParams {
    pub user: UserRef,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingRangeParams {
    pub min_rating: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopRatedParams {
    pub min_reviews: i64,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveReviewersParams {
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSearchParams {
    pub search_text: String,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RatingDistributionParams;

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTrendParams {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HelpfulMoviesParams {
    pub min_votes: i64,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColdStartParams {
    pub min_reviews: i64,
    pub min_rating: f64,
    pub limit: usize,
}

/// Parameters for one query, one typed record per query id.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParams {
    LatestReviews(LatestReviewsParams),
    UserReviews(UserReviewsParams),
    RatingRange(RatingRangeParams),
    TopRated(TopRatedParams),
    ActiveReviewers(ActiveReviewersParams),
    TextSearch(TextSearchParams),
    RatingDistribution(RatingDistributionParams),
    MonthlyTrend(MonthlyTrendParams),
    HelpfulMovies(HelpfulMoviesParams),
    ColdStart(ColdStartParams),
}

impl QueryParams {
    pub fn id(&self) -> QueryId {
        match self {
            QueryParams::LatestReviews(_) => QueryId::Q1,
            QueryParams::UserReviews(_) => QueryId::Q2,
            QueryParams::RatingRange(_) => QueryId::Q3,
            QueryParams::TopRated(_) => QueryId::Q4,
            QueryParams::ActiveReviewers(_) => QueryId::Q5,
            QueryParams::TextSearch(_) => QueryId::Q6,
            QueryParams::RatingDistribution(_) => QueryId::Q7,
            QueryParams::MonthlyTrend(_) => QueryId::Q8,
            QueryParams::HelpfulMovies(_) => QueryId::Q9,
            QueryParams::ColdStart(_) => QueryId::Q10,
        }
    }

    /// Build parameters from flat key/value pairs such as an HTTP query
    /// string. Unknown keys are ignored; missing optional numbers take
    /// their defaults.
    pub fn from_pairs(id: QueryId, pairs: &HashMap<String, String>) -> Result<Self, QueryError> {
        let p = Pairs { id, pairs };
        Ok(match id {
            QueryId::Q1 => QueryParams::LatestReviews(LatestReviewsParams {
                title: p.required("title")?,
                limit: p.limit(20)?,
            }),
            QueryId::Q2 => {
                let user = match (p.text("userId"), p.text("username")) {
                    (Some(user_id), _) => UserRef::Id(user_id),
                    (None, Some(name)) => UserRef::Name(name),
                    (None, None) => {
                        return Err(QueryError::params(id, "one of userId or username is required"));
                    }
                };
                QueryParams::UserReviews(UserReviewsParams {
                    user,
                    limit: p.limit(100)?,
                })
            }
            QueryId::Q3 => {
                let start = p.date("startDate")?;
                let end = p.date("endDate")?;
                if end < start {
                    return Err(QueryError::params(id, "endDate is before startDate"));
                }
                QueryParams::RatingRange(RatingRangeParams {
                    min_rating: p.integer("minRating")?.ok_or_else(|| {
                        QueryError::params(id, "missing required parameter minRating")
                    })?,
                    start,
                    end,
                    limit: p.limit(100)?,
                })
            }
            QueryId::Q4 => QueryParams::TopRated(TopRatedParams {
                min_reviews: p.integer("minReviews")?.unwrap_or(50),
                limit: p.limit(10)?,
            }),
            QueryId::Q5 => QueryParams::ActiveReviewers(ActiveReviewersParams {
                limit: p.limit(10)?,
            }),
            QueryId::Q6 => QueryParams::TextSearch(TextSearchParams {
                search_text: p.required("searchText")?,
                limit: p.limit(20)?,
            }),
            QueryId::Q7 => QueryParams::RatingDistribution(RatingDistributionParams),
            QueryId::Q8 => QueryParams::MonthlyTrend(MonthlyTrendParams {
                title: p.required("title")?,
            }),
            QueryId::Q9 => QueryParams::HelpfulMovies(HelpfulMoviesParams {
                min_votes: p.integer("minVotes")?.unwrap_or(10),
                limit: p.limit(10)?,
            }),
            QueryId::Q10 => QueryParams::ColdStart(ColdStartParams {
                min_reviews: p.integer("minReviews")?.unwrap_or(3),
                min_rating: p.number("minRating")?.unwrap_or(8.5),
                limit: p.limit(10)?,
            }),
        })
    }

    /// The fixed parameters every benchmark run uses.
    pub fn sample(id: QueryId) -> Self {
        match id {
            QueryId::Q1 => QueryParams::LatestReviews(LatestReviewsParams {
                title: "The Dark Knight".into(),
                limit: 20,
            }),
            QueryId::Q2 => QueryParams::UserReviews(UserReviewsParams {
                user: UserRef::Id("user123".into()),
                limit: 100,
            }),
            QueryId::Q3 => QueryParams::RatingRange(RatingRangeParams {
                min_rating: 8,
                start: midnight(2020, 1, 1),
                end: midnight(2023, 12, 31),
                limit: 100,
            }),
            QueryId::Q4 => QueryParams::TopRated(TopRatedParams {
                min_reviews: 50,
                limit: 10,
            }),
            QueryId::Q5 => QueryParams::ActiveReviewers(ActiveReviewersParams { limit: 10 }),
            QueryId::Q6 => QueryParams::TextSearch(TextSearchParams {
                search_text: "great acting".into(),
                limit: 20,
            }),
            QueryId::Q7 => QueryParams::RatingDistribution(RatingDistributionParams),
            QueryId::Q8 => QueryParams::MonthlyTrend(MonthlyTrendParams {
                title: "The Dark Knight".into(),
            }),
            QueryId::Q9 => QueryParams::HelpfulMovies(HelpfulMoviesParams {
                min_votes: 10,
                limit: 10,
            }),
            QueryId::Q10 => QueryParams::ColdStart(ColdStartParams {
                min_reviews: 3,
                min_rating: 8.5,
                limit: 10,
            }),
        }
    }
}

fn midnight(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

struct Pairs<'a> {
    id: QueryId,
    pairs: &'a HashMap<String, String>,
}

impl Pairs<'_> {
    fn text(&self, key: &str) -> Option<String> {
        self.pairs
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn required(&self, key: &str) -> Result<String, QueryError> {
        self.text(key)
            .ok_or_else(|| QueryError::params(self.id, format!("missing required parameter {key}")))
    }

    fn number<T: FromStr>(&self, key: &str) -> Result<Option<T>, QueryError> {
        self.text(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|_| {
                    QueryError::params(self.id, format!("{key} is not a valid number: {raw:?}"))
                })
            })
            .transpose()
    }

    /// Whole-number thresholds. Fractional input is truncated toward zero,
    /// so `minRating=8.5` means 8.
    fn integer(&self, key: &str) -> Result<Option<i64>, QueryError> {
        let Some(raw) = self.text(key) else {
            return Ok(None);
        };
        if let Ok(n) = raw.parse::<i64>() {
            return Ok(Some(n));
        }
        match raw.parse::<f64>() {
            Ok(x) if x.is_finite() && x.abs() < i64::MAX as f64 => Ok(Some(x.trunc() as i64)),
            _ => Err(QueryError::params(
                self.id,
                format!("{key} is not a valid number: {raw:?}"),
            )),
        }
    }

    fn limit(&self, default: usize) -> Result<usize, QueryError> {
        match self.number::<usize>("limit")? {
            None => Ok(default),
            Some(0) => Err(QueryError::params(self.id, "limit must be positive")),
            Some(n) if i64::try_from(n).is_err() => {
                Err(QueryError::params(self.id, format!("limit is too large: {n}")))
            }
            Some(n) => Ok(n),
        }
    }

    fn date(&self, key: &str) -> Result<DateTime<Utc>, QueryError> {
        let raw = self.required(key)?;
        parse_date(&raw)
            .ok_or_else(|| QueryError::params(self.id, format!("{key} is not a valid date: {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(kv: &[(&str, &str)]) -> HashMap<String, String> {
        kv.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn numeric_defaults() {
        let empty = HashMap::new();
        let q1 = QueryParams::from_pairs(QueryId::Q1, &pairs(&[("title", "Heat")])).unwrap();
        assert_eq!(q1, QueryParams::LatestReviews(LatestReviewsParams { title: "Heat".into(), limit: 20 }));

        let QueryParams::TopRated(q4) = QueryParams::from_pairs(QueryId::Q4, &empty).unwrap() else {
            panic!("expected Q4 params");
        };
        assert_eq!((q4.min_reviews, q4.limit), (50, 10));

        let QueryParams::ColdStart(q10) = QueryParams::from_pairs(QueryId::Q10, &empty).unwrap() else {
            panic!("expected Q10 params");
        };
        assert_eq!((q10.min_reviews, q10.min_rating, q10.limit), (3, 8.5, 10));

        let QueryParams::UserReviews(q2) =
            QueryParams::from_pairs(QueryId::Q2, &pairs(&[("username", "ann")])).unwrap()
        else {
            panic!("expected Q2 params");
        };
        assert_eq!(q2.user, UserRef::Name("ann".into()));
        assert_eq!(q2.limit, 100);
    }

    #[test]
    fn missing_required_parameters() {
        let empty = HashMap::new();
        for id in [QueryId::Q1, QueryId::Q2, QueryId::Q3, QueryId::Q6, QueryId::Q8] {
            let err = QueryParams::from_pairs(id, &empty).unwrap_err();
            assert!(matches!(err, QueryError::InvalidParams { query, .. } if query == id), "{id}");
        }
        for id in [QueryId::Q4, QueryId::Q5, QueryId::Q7, QueryId::Q9, QueryId::Q10] {
            assert!(QueryParams::from_pairs(id, &empty).is_ok(), "{id}");
        }
    }

    #[test]
    fn fractional_thresholds_truncate() {
        let QueryParams::RatingRange(q3) = QueryParams::from_pairs(
            QueryId::Q3,
            &pairs(&[("minRating", "8.5"), ("startDate", "2020-01-01"), ("endDate", "2023-12-31")]),
        )
        .unwrap() else {
            panic!("expected Q3 params");
        };
        assert_eq!(q3.min_rating, 8);

        let QueryParams::HelpfulMovies(q9) =
            QueryParams::from_pairs(QueryId::Q9, &pairs(&[("minVotes", "12.9")])).unwrap()
        else {
            panic!("expected Q9 params");
        };
        assert_eq!(q9.min_votes, 12);

        assert!(QueryParams::from_pairs(QueryId::Q4, &pairs(&[("minReviews", "NaN")])).is_err());
    }

    #[test]
    fn limit_must_fit_a_pipeline_stage() {
        let huge = (i64::MAX as u64 + 1).to_string();
        let err = QueryParams::from_pairs(QueryId::Q5, &pairs(&[("limit", huge.as_str())])).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParams { query: QueryId::Q5, .. }));

        let max = i64::MAX.to_string();
        assert!(QueryParams::from_pairs(QueryId::Q5, &pairs(&[("limit", max.as_str())])).is_ok());
    }

    #[test]
    fn unparsable_values() {
        assert!(QueryParams::from_pairs(QueryId::Q4, &pairs(&[("limit", "ten")])).is_err());
        assert!(QueryParams::from_pairs(QueryId::Q5, &pairs(&[("limit", "0")])).is_err());
        assert!(QueryParams::from_pairs(
            QueryId::Q3,
            &pairs(&[("minRating", "8"), ("startDate", "yesterday"), ("endDate", "2023-12-31")])
        )
        .is_err());
    }

    #[test]
    fn date_range() {
        let params = QueryParams::from_pairs(
            QueryId::Q3,
            &pairs(&[("minRating", "8"), ("startDate", "2020-01-01"), ("endDate", "2023-12-31")]),
        )
        .unwrap();
        assert_eq!(params, QueryParams::sample(QueryId::Q3));
        assert_eq!(
            parse_date("2021-06-01T12:30:00Z").map(|d| d.timestamp()),
            Some(1_622_550_600)
        );
    }

    #[test]
    fn samples_cover_every_query() {
        for id in QueryId::ALL {
            assert_eq!(QueryParams::sample(id).id(), id);
        }
    }
}
