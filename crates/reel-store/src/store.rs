use bson::{Bson, Document};

use crate::error::StoreError;
use crate::index::IndexModel;

/// Options for [`DocumentStore::find`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub filter: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn filter(filter: Document) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A document database the query layer runs against.
///
/// Collections are created implicitly by the first write or index creation.
pub trait DocumentStore: Send + Sync {
    /// Short engine name, recorded in benchmark reports.
    fn engine(&self) -> &'static str;

    /// Insert documents, assigning an `ObjectId` `_id` where absent.
    /// Returns the ids in input order. The batch is rejected as a whole when
    /// it would violate a unique index.
    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<Bson>, StoreError>;

    /// Delete every matching document. An empty filter clears the collection.
    fn delete_many(&self, collection: &str, filter: &Document) -> Result<u64, StoreError>;

    fn count(&self, collection: &str, filter: &Document) -> Result<u64, StoreError>;

    /// Distinct values of `field`, in first-seen order. Array values
    /// contribute their elements.
    fn distinct(&self, collection: &str, field: &str) -> Result<Vec<Bson>, StoreError>;

    fn find(&self, collection: &str, options: FindOptions) -> Result<Vec<Document>, StoreError>;

    fn find_one(&self, collection: &str, filter: &Document) -> Result<Option<Document>, StoreError> {
        Ok(self
            .find(collection, FindOptions::filter(filter.clone()).limit(1))?
            .into_iter()
            .next())
    }

    fn aggregate(&self, collection: &str, pipeline: &[Document]) -> Result<Vec<Document>, StoreError>;

    /// Create an index and return its name. Re-creating an identical index is
    /// a no-op; reusing a name for a different index fails with
    /// [`StoreError::IndexConflict`].
    fn create_index(&self, collection: &str, model: IndexModel) -> Result<String, StoreError>;

    /// Drop every index except `_id_`, returning how many were dropped.
    fn drop_indexes(&self, collection: &str) -> Result<usize, StoreError>;

    /// Indexes of a collection, `_id_` first, each with its name filled in.
    fn list_indexes(&self, collection: &str) -> Result<Vec<IndexModel>, StoreError>;

    fn list_collections(&self) -> Result<Vec<String>, StoreError>;
}
