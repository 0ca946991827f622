use std::collections::{HashMap, HashSet};

use bson::oid::ObjectId;
use bson::{Bson, Document};

use crate::error::StoreError;
use crate::filter::{self, Expression};
use crate::index::{ID_INDEX, IndexModel};
use crate::path;
use crate::pipeline::Row;
use crate::text::{self, TextFields};
use crate::value;

/// An index and its equality lookup table over the leading key.
#[derive(Debug, Clone)]
struct Index {
    model: IndexModel,
    /// Canonical value key -> positions. Empty for text indexes.
    entries: HashMap<String, Vec<usize>>,
}

impl Index {
    fn build(model: IndexModel, docs: &[Document]) -> Result<Self, StoreError> {
        let mut index = Self {
            model,
            entries: HashMap::new(),
        };
        let mut seen = HashSet::new();
        for (pos, doc) in docs.iter().enumerate() {
            index.check_unique(doc, &mut seen)?;
            index.add(doc, pos);
        }
        Ok(index)
    }

    fn name(&self) -> String {
        self.model.name()
    }

    fn add(&mut self, doc: &Document, pos: usize) {
        if self.model.is_text() {
            return;
        }
        if let Some(keys) = self.leading_keys(doc) {
            for key in keys {
                self.entries.entry(key).or_default().push(pos);
            }
        }
    }

    /// Keys the document is filed under. `None` when a sparse index skips it.
    fn leading_keys(&self, doc: &Document) -> Option<Vec<String>> {
        let field = self.model.leading_field()?;
        let found = path::lookup(doc, field);
        if found.is_empty() {
            if self.model.options.sparse {
                return None;
            }
            return Some(vec![value::key_of(&Bson::Null)]);
        }
        let mut keys = Vec::new();
        for v in found {
            keys.push(value::key_of(v));
            if let Bson::Array(items) = v {
                keys.extend(items.iter().map(value::key_of));
            }
        }
        keys.sort();
        keys.dedup();
        Some(keys)
    }

    /// Composite key across every indexed field, for uniqueness checks.
    fn unique_key(&self, doc: &Document) -> Option<String> {
        let mut parts = Vec::new();
        let mut any = false;
        for field in self.model.fields() {
            match path::lookup(doc, field).first() {
                Some(v) => {
                    any = true;
                    parts.push(value::key_of(v));
                }
                None => parts.push(value::key_of(&Bson::Null)),
            }
        }
        if !any && self.model.options.sparse {
            return None;
        }
        Some(parts.join("|"))
    }

    fn check_unique(&self, doc: &Document, seen: &mut HashSet<String>) -> Result<(), StoreError> {
        if !self.model.options.unique {
            return Ok(());
        }
        if let Some(key) = self.unique_key(doc) {
            if !seen.insert(key.clone()) {
                return Err(StoreError::DuplicateKey {
                    index: self.name(),
                    key,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Collection {
    docs: Vec<Document>,
    indexes: Vec<Index>,
}

impl Collection {
    pub(crate) fn new() -> Self {
        Self {
            docs: Vec::new(),
            indexes: vec![Index {
                model: IndexModel::primary(),
                entries: HashMap::new(),
            }],
        }
    }

    pub(crate) fn docs(&self) -> &[Document] {
        &self.docs
    }

    pub(crate) fn insert_many(&mut self, docs: Vec<Document>) -> Result<Vec<Bson>, StoreError> {
        let mut docs = docs;
        for doc in &mut docs {
            if !doc.contains_key("_id") {
                let mut with_id = Document::new();
                with_id.insert("_id", ObjectId::new());
                for (key, value) in doc.iter() {
                    with_id.insert(key.clone(), value.clone());
                }
                *doc = with_id;
            }
        }

        for index in self.indexes.iter().filter(|i| i.model.options.unique) {
            let mut seen: HashSet<String> =
                self.docs.iter().filter_map(|d| index.unique_key(d)).collect();
            for doc in &docs {
                index.check_unique(doc, &mut seen)?;
            }
        }

        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs {
            let pos = self.docs.len();
            for index in &mut self.indexes {
                index.add(&doc, pos);
            }
            ids.push(doc.get("_id").cloned().unwrap_or(Bson::Null));
            self.docs.push(doc);
        }
        Ok(ids)
    }

    pub(crate) fn delete_many(&mut self, expr: &Expression) -> u64 {
        let fields = self.text_fields();
        let before = self.docs.len();
        self.docs.retain(|d| !filter::matches(d, expr, &fields));
        let deleted = before - self.docs.len();
        if deleted > 0 {
            self.reindex();
        }
        deleted as u64
    }

    fn reindex(&mut self) {
        for index in &mut self.indexes {
            index.entries.clear();
        }
        for (pos, doc) in self.docs.iter().enumerate() {
            for index in &mut self.indexes {
                index.add(doc, pos);
            }
        }
    }

    /// Fields and weights a `$text` query searches.
    pub(crate) fn text_fields(&self) -> TextFields {
        self.indexes
            .iter()
            .find(|i| i.model.is_text())
            .map(|i| i.model.text_fields())
            .unwrap_or(TextFields::AllStrings)
    }

    /// Positions answering a top-level equality or `$in` from an index.
    fn candidates(&self, expr: &Expression) -> Option<Vec<usize>> {
        match expr {
            Expression::Eq(field, v) => self.probe(field, std::slice::from_ref(v)),
            Expression::In(field, vs) => self.probe(field, vs),
            Expression::And(children) => children.iter().find_map(|c| self.candidates(c)),
            _ => None,
        }
    }

    fn probe(&self, field: &str, values: &[Bson]) -> Option<Vec<usize>> {
        let index = self.indexes.iter().find(|i| {
            !i.model.is_text()
                && !i.model.options.sparse
                && i.model.leading_field() == Some(field)
        })?;
        let mut positions: Vec<usize> = values
            .iter()
            .filter(|v| !matches!(v, Bson::RegularExpression(_)))
            .flat_map(|v| index.entries.get(&value::key_of(v)).into_iter().flatten().copied())
            .collect();
        positions.sort_unstable();
        positions.dedup();
        Some(positions)
    }

    /// Matching rows in collection order, scored when the filter has `$text`.
    pub(crate) fn select(&self, expr: &Expression) -> Vec<Row> {
        let fields = self.text_fields();
        let search = expr.text_search();
        let make_row = |doc: &Document| {
            let score = search.map_or(0.0, |s| text::score(doc, s, &fields));
            Row {
                doc: doc.clone(),
                score,
            }
        };

        match self.candidates(expr) {
            Some(positions) => positions
                .into_iter()
                .filter_map(|p| self.docs.get(p))
                .filter(|d| filter::matches(d, expr, &fields))
                .map(make_row)
                .collect(),
            None => self
                .docs
                .iter()
                .filter(|d| filter::matches(d, expr, &fields))
                .map(make_row)
                .collect(),
        }
    }

    pub(crate) fn create_index(&mut self, model: IndexModel) -> Result<String, StoreError> {
        model.validate()?;
        let name = model.name();

        for existing in &self.indexes {
            let same_name = existing.name() == name;
            let same_keys = value::key_of(&Bson::Document(existing.model.keys.clone()))
                == value::key_of(&Bson::Document(model.keys.clone()));
            if same_name || same_keys {
                if existing.model.same_spec(&model) && same_name {
                    return Ok(name);
                }
                return Err(StoreError::IndexConflict {
                    name: existing.name(),
                });
            }
            if existing.model.is_text() && model.is_text() {
                return Err(StoreError::IndexConflict {
                    name: existing.name(),
                });
            }
        }

        let index = Index::build(model, &self.docs)?;
        self.indexes.push(index);
        Ok(name)
    }

    pub(crate) fn drop_indexes(&mut self) -> usize {
        let before = self.indexes.len();
        self.indexes.retain(|i| i.name() == ID_INDEX);
        before - self.indexes.len()
    }

    pub(crate) fn list_indexes(&self) -> Vec<IndexModel> {
        self.indexes
            .iter()
            .map(|i| {
                let name = i.name();
                i.model.clone().named(name)
            })
            .collect()
    }
}
