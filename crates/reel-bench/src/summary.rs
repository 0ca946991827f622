use std::time::Duration;

use reel_query::{QueryId, SchemaVariant};
use serde::Serialize;

/// Timing of one benchmark cell, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSummary {
    pub query_id: QueryId,
    pub model: SchemaVariant,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub samples: Vec<f64>,
}

impl CellSummary {
    pub fn new(query_id: QueryId, model: SchemaVariant, samples: Vec<f64>) -> Self {
        let (median, min, max) = summarize(&samples);
        Self {
            query_id,
            model,
            median,
            min,
            max,
            samples,
        }
    }
}

/// `(median, min, max)` of `samples`. The median is the middle sample after
/// sorting, never an average; with an even count the upper middle is used.
/// All zeros for no samples.
pub fn summarize(samples: &[f64]) -> (f64, f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    (sorted[sorted.len() / 2], sorted[0], sorted[sorted.len() - 1])
}

pub(crate) fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_three_is_the_middle_value() {
        assert_eq!(summarize(&[30.0, 10.0, 20.0]), (20.0, 10.0, 30.0));
    }

    #[test]
    fn median_is_never_averaged() {
        assert_eq!(summarize(&[4.0, 1.0, 3.0, 2.0]), (3.0, 1.0, 4.0));
        assert_eq!(summarize(&[7.5]), (7.5, 7.5, 7.5));
        assert_eq!(summarize(&[]), (0.0, 0.0, 0.0));
    }

    #[test]
    fn cell_serializes_with_report_keys() {
        let cell = CellSummary::new(QueryId::Q4, SchemaVariant::B, vec![30.0, 10.0, 20.0]);
        assert_eq!(
            serde_json::to_value(&cell).unwrap(),
            serde_json::json!({
                "queryId": "Q4",
                "model": "B",
                "median": 20.0,
                "min": 10.0,
                "max": 30.0,
                "samples": [30.0, 10.0, 20.0],
            })
        );
    }

    #[test]
    fn durations_become_milliseconds() {
        assert_eq!(millis(Duration::from_secs(3)), 3000.0);
    }
}
