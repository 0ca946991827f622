use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bson::{Bson, Document};
use reel_bench::{BenchError, BenchmarkHarness, persist_report};
use reel_ingest::{ingest, synthetic};
use reel_query::{IndexManager, QueryId, QueryRegistry, SchemaVariant, USERS_B, index_set};
use reel_store::{DocumentStore, FindOptions, IndexModel, MemoryStore, StoreError};

fn seeded(store: Arc<dyn DocumentStore>) -> Arc<dyn DocumentStore> {
    let dataset = synthetic::generate(400, 17);
    for variant in SchemaVariant::ALL {
        ingest(&store, variant, &dataset).unwrap();
    }
    store
}

fn harness(store: &Arc<dyn DocumentStore>) -> BenchmarkHarness {
    let registry = Arc::new(QueryRegistry::new(Arc::clone(store)));
    BenchmarkHarness::new(registry, IndexManager::new(Arc::clone(store))).with_repetitions(1)
}

fn assert_fully_indexed(store: &Arc<dyn DocumentStore>) {
    let manager = IndexManager::new(Arc::clone(store));
    for variant in SchemaVariant::ALL {
        let present = manager.present(variant).unwrap();
        assert_eq!(
            present.len(),
            index_set(variant).len() + variant.collections().len(),
            "model {variant} is not fully indexed"
        );
    }
}

// ── Complete runs ────────────────────────────────────────────────

#[test]
fn run_covers_every_cell_and_ends_indexed() {
    let store = seeded(Arc::new(MemoryStore::new()));
    let report = harness(&store).run().unwrap();

    assert_eq!(report.cell_count(), 40);
    for pass in [&report.with_indexes, &report.without_indexes] {
        for variant in SchemaVariant::ALL {
            for query in QueryId::ALL {
                let cell = pass.get(variant, query).unwrap();
                assert_eq!(cell.samples.len(), 1);
                assert!(cell.min <= cell.median && cell.median <= cell.max);
            }
        }
    }
    assert_eq!(report.environment.store, "memory");
    assert_fully_indexed(&store);
}

#[test]
fn repetitions_set_the_sample_count() {
    let store = seeded(Arc::new(MemoryStore::new()));
    let report = harness(&store).with_repetitions(3).run().unwrap();
    let cell = report.with_indexes.get(SchemaVariant::B, QueryId::Q4).unwrap();
    assert_eq!(cell.samples.len(), 3);
}

#[test]
fn persisted_report_replaces_same_day_file() {
    let store = seeded(Arc::new(MemoryStore::new()));
    let report = harness(&store).run().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested");

    let first = persist_report(&target, &report).unwrap();
    let second = persist_report(&target, &report).unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read_dir(&target).unwrap().count(), 1);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&first).unwrap()).unwrap();
    assert_eq!(json["withIndexes"]["modelA"]["Q1"]["queryId"], "Q1");
    assert!(json["timestamp"].is_string());
}

// ── Failures ─────────────────────────────────────────────────────

/// Delegates to a memory store, with failures switched on per test.
#[derive(Default)]
struct Flaky {
    inner: MemoryStore,
    /// Fail aggregations once any index has been dropped.
    fail_after_drop: bool,
    /// Refuse to drop indexes on this collection.
    refuse_drop: Option<&'static str>,
    dropped: AtomicBool,
}

impl DocumentStore for Flaky {
    fn engine(&self) -> &'static str {
        self.inner.engine()
    }

    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<Bson>, StoreError> {
        self.inner.insert_many(collection, docs)
    }

    fn delete_many(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        self.inner.delete_many(collection, filter)
    }

    fn count(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        self.inner.count(collection, filter)
    }

    fn distinct(&self, collection: &str, field: &str) -> Result<Vec<Bson>, StoreError> {
        self.inner.distinct(collection, field)
    }

    fn find(&self, collection: &str, options: FindOptions) -> Result<Vec<Document>, StoreError> {
        self.inner.find(collection, options)
    }

    fn aggregate(&self, collection: &str, pipeline: &[Document]) -> Result<Vec<Document>, StoreError> {
        if self.fail_after_drop && self.dropped.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("connection lost".into()));
        }
        self.inner.aggregate(collection, pipeline)
    }

    fn create_index(&self, collection: &str, model: IndexModel) -> Result<String, StoreError> {
        self.inner.create_index(collection, model)
    }

    fn drop_indexes(&self, collection: &str) -> Result<usize, StoreError> {
        if self.refuse_drop == Some(collection) {
            return Err(StoreError::Storage("drop refused".into()));
        }
        self.dropped.store(true, Ordering::SeqCst);
        self.inner.drop_indexes(collection)
    }

    fn list_indexes(&self, collection: &str) -> Result<Vec<IndexModel>, StoreError> {
        self.inner.list_indexes(collection)
    }

    fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_collections()
    }
}

#[test]
fn failed_run_still_restores_indexes() {
    let store = seeded(Arc::new(Flaky {
        fail_after_drop: true,
        ..Flaky::default()
    }));

    let err = harness(&store).run().unwrap_err();
    assert!(matches!(err, BenchError::Query(_)));
    assert!(err.to_string().contains("connection lost"));
    assert_fully_indexed(&store);
}

#[test]
fn refused_drop_does_not_abort_the_run() {
    let store = seeded(Arc::new(Flaky {
        refuse_drop: Some(USERS_B),
        ..Flaky::default()
    }));

    let report = harness(&store).run().unwrap();
    assert_eq!(report.cell_count(), 40);
    assert_fully_indexed(&store);
}

#[test]
fn refused_drop_still_drops_other_collections() {
    let store = seeded(Arc::new(Flaky {
        refuse_drop: Some(USERS_B),
        ..Flaky::default()
    }));
    let manager = IndexManager::new(Arc::clone(&store));

    let report = manager.drop_indexes(SchemaVariant::B);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].collection, USERS_B);
    assert!(report.warnings[0].message.contains("drop refused"));
    let users_declared = index_set(SchemaVariant::B)
        .iter()
        .filter(|s| s.collection == USERS_B)
        .count();
    assert_eq!(report.dropped, index_set(SchemaVariant::B).len() - users_declared);
}
