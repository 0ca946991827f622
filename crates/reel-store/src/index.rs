use bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::text::TextFields;
use crate::value;

/// Name of the implicit primary-key index every collection carries.
pub const ID_INDEX: &str = "_id_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub sparse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Document>,
}

/// An index specification: ordered key document plus options.
///
/// Key values are `1` / `-1` for ordered keys and `"text"` for text keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexModel {
    pub keys: Document,
    #[serde(default)]
    pub options: IndexOptions,
}

impl IndexModel {
    pub fn new(keys: Document) -> Self {
        Self {
            keys,
            options: IndexOptions::default(),
        }
    }

    pub(crate) fn primary() -> Self {
        Self::new(doc! { "_id": 1 }).named(ID_INDEX).unique()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.options.unique = true;
        self
    }

    pub fn sparse(mut self) -> Self {
        self.options.sparse = true;
        self
    }

    pub fn weights(mut self, weights: Document) -> Self {
        self.options.weights = Some(weights);
        self
    }

    /// Explicit name, or the conventional generated one (`rating_-1`,
    /// `review_content_text_movie.title_text`).
    pub fn name(&self) -> String {
        if let Some(name) = &self.options.name {
            return name.clone();
        }
        self.keys
            .iter()
            .map(|(field, dir)| match dir {
                Bson::String(s) => format!("{field}_{s}"),
                other => match value::as_number(other) {
                    Some(n) => format!("{field}_{}", n as i64),
                    None => format!("{field}_{other}"),
                },
            })
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn is_text(&self) -> bool {
        self.keys
            .values()
            .any(|v| matches!(v, Bson::String(s) if s == "text"))
    }

    /// First key field, which an equality lookup table is built on.
    pub fn leading_field(&self) -> Option<&str> {
        self.keys.keys().next().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Text fields with their weights; unweighted text keys count 1.
    pub fn text_fields(&self) -> TextFields {
        let fields = self
            .keys
            .iter()
            .filter(|(_, dir)| matches!(dir, Bson::String(s) if s == "text"))
            .map(|(field, _)| {
                let weight = self
                    .options
                    .weights
                    .as_ref()
                    .and_then(|w| w.get(field))
                    .and_then(value::as_number)
                    .unwrap_or(1.0);
                (field.clone(), weight)
            })
            .collect();
        TextFields::Weighted(fields)
    }

    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        if self.keys.is_empty() {
            return Err(StoreError::InvalidIndex("index keys must not be empty".into()));
        }
        for (field, dir) in &self.keys {
            let ok = match dir {
                Bson::String(s) => s == "text",
                other => value::as_number(other).is_some_and(|n| n == 1.0 || n == -1.0),
            };
            if !ok {
                return Err(StoreError::InvalidIndex(format!(
                    "unsupported key type for {field}: {dir}"
                )));
            }
        }
        if let Some(weights) = &self.options.weights {
            if !self.is_text() {
                return Err(StoreError::InvalidIndex(
                    "weights are only valid on text indexes".into(),
                ));
            }
            for (field, w) in weights {
                if !value::as_number(w).is_some_and(|n| n > 0.0) {
                    return Err(StoreError::InvalidIndex(format!(
                        "weight for {field} must be a positive number"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Whether two models describe the same index, ignoring how numbers are typed.
    pub(crate) fn same_spec(&self, other: &IndexModel) -> bool {
        let text_eq = match (self.is_text(), other.is_text()) {
            (true, true) => self.text_fields() == other.text_fields(),
            (false, false) => true,
            _ => false,
        };
        value::key_of(&Bson::Document(self.keys.clone()))
            == value::key_of(&Bson::Document(other.keys.clone()))
            && self.options.unique == other.options.unique
            && self.options.sparse == other.options.sparse
            && text_eq
    }
}
