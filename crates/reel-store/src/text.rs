//! Full-text matching and relevance scoring.

use bson::{Bson, Document};
use unicode_segmentation::UnicodeSegmentation;

use crate::path;

/// Parsed `$text: { $search: ... }` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearch {
    pub terms: Vec<String>,
}

impl TextSearch {
    pub fn parse(search: &str) -> Self {
        let mut terms = tokenize(search);
        terms.sort();
        terms.dedup();
        Self { terms }
    }
}

/// Which fields a text query looks at, and how much each one counts.
#[derive(Debug, Clone, PartialEq)]
pub enum TextFields {
    /// Fields and weights declared by the collection's text index.
    Weighted(Vec<(String, f64)>),
    /// No text index: every string field counts with weight 1.
    AllStrings,
}

/// Lowercased words on Unicode word boundaries.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

/// Relevance of `doc` for `search`. Zero means no match.
pub fn score(doc: &Document, search: &TextSearch, fields: &TextFields) -> f64 {
    if search.terms.is_empty() {
        return 0.0;
    }

    match fields {
        TextFields::Weighted(weighted) => weighted
            .iter()
            .map(|(field, weight)| {
                path::lookup_flat(doc, field)
                    .into_iter()
                    .filter_map(Bson::as_str)
                    .map(|s| weight * field_score(s, search))
                    .sum::<f64>()
            })
            .sum(),
        TextFields::AllStrings => {
            let mut total = 0.0;
            for (key, value) in doc {
                if key != "_id" {
                    total += all_strings_score(value, search);
                }
            }
            total
        }
    }
}

fn all_strings_score(value: &Bson, search: &TextSearch) -> f64 {
    match value {
        Bson::String(s) => field_score(s, search),
        Bson::Document(doc) => doc.values().map(|v| all_strings_score(v, search)).sum(),
        Bson::Array(items) => items.iter().map(|v| all_strings_score(v, search)).sum(),
        _ => 0.0,
    }
}

fn field_score(text: &str, search: &TextSearch) -> f64 {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return 0.0;
    }
    let hits = tokens
        .iter()
        .filter(|t| search.terms.binary_search(t).is_ok())
        .count();
    if hits == 0 {
        return 0.0;
    }
    hits as f64 * (0.5 + 0.5 / tokens.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn tokenize_lowercases_and_splits_punctuation() {
        assert_eq!(tokenize("Great acting, GREAT plot!"), vec!["great", "acting", "great", "plot"]);
    }

    #[test]
    fn tokenize_keeps_apostrophes_and_accents() {
        assert_eq!(tokenize("Amélie's charm, CAFÉ scenes"), vec!["amélie's", "charm", "café", "scenes"]);
    }

    #[test]
    fn any_term_matches() {
        let search = TextSearch::parse("great acting");
        let fields = TextFields::Weighted(vec![("review_content".into(), 1.0)]);
        let hit = doc! { "review_content": "The acting was fine" };
        let miss = doc! { "review_content": "Boring plot" };
        assert!(score(&hit, &search, &fields) > 0.0);
        assert_eq!(score(&miss, &search, &fields), 0.0);
    }

    #[test]
    fn weights_scale_scores() {
        let search = TextSearch::parse("acting");
        let d = doc! { "review_content": "acting", "movie": { "title": "acting" } };
        let content_only = TextFields::Weighted(vec![("review_content".into(), 3.0)]);
        let both = TextFields::Weighted(vec![
            ("review_content".into(), 3.0),
            ("movie.title".into(), 2.0),
        ]);
        assert_eq!(score(&d, &search, &content_only), 3.0);
        assert_eq!(score(&d, &search, &both), 5.0);
    }

    #[test]
    fn more_hits_rank_higher() {
        let search = TextSearch::parse("great acting");
        let fields = TextFields::AllStrings;
        let strong = doc! { "review_content": "great acting great cast" };
        let weak = doc! { "review_content": "great cast and a long list of other words" };
        assert!(score(&strong, &search, &fields) > score(&weak, &search, &fields));
    }
}
