use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bson::{Bson, Document};

use super::collection::Collection;
use crate::error::StoreError;
use crate::filter::{self, Expression};
use crate::index::IndexModel;
use crate::path;
use crate::pipeline::{self, Pipeline, PipelineContext, Projection, Row};
use crate::sort::SortSpec;
use crate::store::{DocumentStore, FindOptions};
use crate::text::TextFields;
use crate::value;

/// In-memory document store. Each collection keeps its documents in insertion
/// order alongside its index tables.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.collections
            .read()
            .map_err(|e| StoreError::Storage(format!("collections lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.collections
            .write()
            .map_err(|e| StoreError::Storage(format!("collections lock poisoned: {e}")))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipeline view over the locked collection map.
struct Snapshot<'a> {
    collections: &'a HashMap<String, Collection>,
    source: Option<&'a Collection>,
}

impl PipelineContext for Snapshot<'_> {
    fn lookup(
        &self,
        collection: &str,
        field: &str,
        values: &[Bson],
    ) -> Result<Vec<Document>, StoreError> {
        let Some(foreign) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let expr = Expression::In(field.to_string(), values.to_vec());
        Ok(foreign.select(&expr).into_iter().map(|row| row.doc).collect())
    }

    fn text_fields(&self) -> TextFields {
        self.source
            .map(Collection::text_fields)
            .unwrap_or(TextFields::AllStrings)
    }
}

impl DocumentStore for MemoryStore {
    fn engine(&self) -> &'static str {
        "memory"
    }

    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<Bson>, StoreError> {
        let mut collections = self.write()?;
        collections
            .entry(collection.to_string())
            .or_insert_with(Collection::new)
            .insert_many(docs)
    }

    fn delete_many(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        let expr = filter::parse_filter(filter)?;
        let mut collections = self.write()?;
        Ok(collections
            .get_mut(collection)
            .map_or(0, |c| c.delete_many(&expr)))
    }

    fn count(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        let expr = filter::parse_filter(filter)?;
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map_or(0, |c| c.select(&expr).len() as u64))
    }

    fn distinct(&self, collection: &str, field: &str) -> Result<Vec<Bson>, StoreError> {
        let collections = self.read()?;
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for doc in coll.docs() {
            for v in path::lookup_flat(doc, field) {
                if seen.insert(value::key_of(v)) {
                    out.push(v.clone());
                }
            }
        }
        Ok(out)
    }

    fn find(&self, collection: &str, options: FindOptions) -> Result<Vec<Document>, StoreError> {
        let expr = filter::parse_filter(&options.filter)?;
        let sort = options.sort.as_ref().map(SortSpec::parse).transpose()?;
        let projection = options.projection.as_ref().map(Projection::parse).transpose()?;

        let collections = self.read()?;
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<Row> = coll.select(&expr);
        drop(collections);

        if let Some(sort) = &sort {
            rows.sort_by(|a, b| sort.compare(&a.doc, &b.doc, (a.score, b.score)));
        }
        let rows = rows
            .into_iter()
            .skip(options.skip.unwrap_or(0))
            .take(options.limit.unwrap_or(usize::MAX));

        match projection {
            Some(p) => rows.map(|row| p.apply(&row.doc, row.score)).collect(),
            None => Ok(rows.map(|row| row.doc).collect()),
        }
    }

    fn aggregate(&self, collection: &str, pipeline: &[Document]) -> Result<Vec<Document>, StoreError> {
        let pipeline = Pipeline::parse(pipeline)?;
        let (leading, rest) = pipeline.split_leading_match();

        let collections = self.read()?;
        let source = collections.get(collection);
        let rows = match (source, leading) {
            (None, _) => Vec::new(),
            (Some(coll), Some(expr)) => coll.select(expr),
            (Some(coll), None) => coll.docs().iter().cloned().map(Row::new).collect(),
        };
        let ctx = Snapshot {
            collections: &collections,
            source,
        };
        pipeline::execute(rest, rows, &ctx)
    }

    fn create_index(&self, collection: &str, model: IndexModel) -> Result<String, StoreError> {
        let mut collections = self.write()?;
        collections
            .entry(collection.to_string())
            .or_insert_with(Collection::new)
            .create_index(model)
    }

    fn drop_indexes(&self, collection: &str) -> Result<usize, StoreError> {
        let mut collections = self.write()?;
        collections
            .get_mut(collection)
            .map(Collection::drop_indexes)
            .ok_or_else(|| StoreError::NamespaceNotFound(collection.to_string()))
    }

    fn list_indexes(&self, collection: &str) -> Result<Vec<IndexModel>, StoreError> {
        let collections = self.read()?;
        collections
            .get(collection)
            .map(Collection::list_indexes)
            .ok_or_else(|| StoreError::NamespaceNotFound(collection.to_string()))
    }

    fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
