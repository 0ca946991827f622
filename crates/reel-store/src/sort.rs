use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::error::StoreError;
use crate::path;
use crate::value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Field { path: String, direction: SortDirection },
    /// `{ field: { $meta: "textScore" } }`: highest relevance first.
    TextScore,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SortSpec {
    pub keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn parse(doc: &Document) -> Result<Self, StoreError> {
        let mut keys = Vec::with_capacity(doc.len());
        for (field, dir) in doc {
            let key = match dir {
                Bson::Document(meta) if meta.get_str("$meta").ok() == Some("textScore") => {
                    SortKey::TextScore
                }
                other => match value::as_number(other) {
                    Some(n) if n == 1.0 => SortKey::Field {
                        path: field.clone(),
                        direction: SortDirection::Asc,
                    },
                    Some(n) if n == -1.0 => SortKey::Field {
                        path: field.clone(),
                        direction: SortDirection::Desc,
                    },
                    _ => {
                        return Err(StoreError::InvalidFilter(format!(
                            "invalid sort direction for {field}: {other}"
                        )));
                    }
                },
            };
            keys.push(key);
        }
        Ok(Self { keys })
    }

    pub fn uses_text_score(&self) -> bool {
        self.keys.contains(&SortKey::TextScore)
    }

    /// Compare two documents; `scores` carries their text relevance when known.
    pub fn compare(&self, a: &Document, b: &Document, scores: (f64, f64)) -> Ordering {
        for key in &self.keys {
            let ord = match key {
                SortKey::TextScore => scores.1.total_cmp(&scores.0),
                SortKey::Field { path, direction } => {
                    let va = sort_value(a, path, *direction);
                    let vb = sort_value(b, path, *direction);
                    let ord = value::compare(&va, &vb);
                    match direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort of a document list.
    pub fn sort(&self, docs: &mut [Document]) {
        if self.keys.is_empty() {
            return;
        }
        docs.sort_by(|a, b| self.compare(a, b, (0.0, 0.0)));
    }
}

/// The value a document sorts by: arrays sort by their smallest element
/// ascending and their largest element descending; missing sorts as null.
fn sort_value(doc: &Document, path: &str, direction: SortDirection) -> Bson {
    let values = path::lookup_flat(doc, path);
    let picked = match direction {
        SortDirection::Asc => values.into_iter().min_by(|a, b| value::compare(a, b)),
        SortDirection::Desc => values.into_iter().max_by(|a, b| value::compare(a, b)),
    };
    picked.cloned().unwrap_or(Bson::Null)
}
