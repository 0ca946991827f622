use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use reel_ingest::{Dataset, IngestCounts, IngestError, ingest, synthetic};
use reel_query::{IndexManager, QueryId, QueryParams, QueryRegistry, SchemaVariant, index_set};
use reel_store::{DocumentStore, MemoryStore};

fn store() -> Arc<dyn DocumentStore> {
    Arc::new(MemoryStore::new())
}

// ── Counts ───────────────────────────────────────────────────────

#[test]
fn counts_per_model() {
    let store = store();
    let dataset = synthetic::generate(2500, 42);

    let a = ingest(&store, SchemaVariant::A, &dataset).unwrap();
    let b = ingest(&store, SchemaVariant::B, &dataset).unwrap();

    let (IngestCounts::Embedded { reviews, unique_movies, unique_users }, IngestCounts::Normalized { reviews: b_reviews, movies, users }) = (a, b) else {
        panic!("unexpected count shapes");
    };
    assert_eq!(reviews, 2500);
    assert_eq!(b_reviews, 2500);
    assert_eq!(unique_movies as u64, movies);
    assert_eq!(unique_users as u64, users);
}

#[test]
fn reingesting_replaces_previous_data() {
    let store = store();
    ingest(&store, SchemaVariant::B, &synthetic::generate(300, 1)).unwrap();
    let counts = ingest(&store, SchemaVariant::B, &synthetic::generate(120, 2)).unwrap();
    assert!(matches!(counts, IngestCounts::Normalized { reviews: 120, .. }));
}

#[test]
fn counts_serialize_with_report_keys() {
    let counts = IngestCounts::Embedded { reviews: 3, unique_movies: 2, unique_users: 1 };
    assert_eq!(
        serde_json::to_value(&counts).unwrap(),
        serde_json::json!({ "reviews": 3, "uniqueMovies": 2, "uniqueUsers": 1 })
    );
}

// ── Indexes ──────────────────────────────────────────────────────

#[test]
fn ingestion_creates_declared_indexes() {
    let store = store();
    ingest(&store, SchemaVariant::B, &synthetic::generate(200, 5)).unwrap();
    let present = IndexManager::new(Arc::clone(&store)).present(SchemaVariant::B).unwrap();
    // Declared indexes plus one `_id_` per collection.
    assert_eq!(present.len(), index_set(SchemaVariant::B).len() + 3);
}

// ── Equivalence ──────────────────────────────────────────────────

#[test]
fn both_models_answer_sample_queries_alike() {
    let store = store();
    let dataset = synthetic::generate(1500, 9);
    ingest(&store, SchemaVariant::A, &dataset).unwrap();
    ingest(&store, SchemaVariant::B, &dataset).unwrap();
    let registry = QueryRegistry::new(store);

    for id in QueryId::ALL {
        if id == QueryId::Q6 {
            continue;
        }
        let params = QueryParams::sample(id);
        let a = registry.execute(id, SchemaVariant::A, &params).unwrap();
        let b = registry.execute(id, SchemaVariant::B, &params).unwrap();
        if id != QueryId::Q10 {
            assert!(!a.is_empty(), "{id} returned nothing");
        }
        assert_eq!(a, b, "{id} differs between models");
    }
}

#[test]
fn rows_disagreeing_on_movie_details_stay_equivalent() {
    let lines = [
        r#"{"movie_id":"tt1","movie_title":"Heat","year":1995,"genres":"Crime,Drama","username":"ann","rating":9,"review_content":"Tense","review_date":"2020-02-03"}"#,
        r#"{"movie_id":"tt1","movie_title":"Heat","username":"bob","rating":9,"review_content":"Long","review_date":"2020-03-04"}"#,
        r#"{"movie_id":"tt2","movie_title":"Alien","year":1979,"genres":["Horror"],"username":"ann","rating":7,"review_content":"Scary","review_date":"2021-05-05"}"#,
        r#"{"movie_id":"tt2","movie_title":"Alien","year":1986,"genres":["Action"],"username":"cy","rating":8,"review_content":"Louder","review_date":"2021-06-06"}"#,
    ];
    let dataset = Dataset::from_reader(lines.join("\n").as_bytes()).unwrap();
    assert_eq!(dataset.len(), 4);

    let store = store();
    ingest(&store, SchemaVariant::A, &dataset).unwrap();
    ingest(&store, SchemaVariant::B, &dataset).unwrap();
    let registry = QueryRegistry::new(store);

    let filters = HashMap::from([
        ("minReviews".to_string(), "2".to_string()),
        ("minRating".to_string(), "0".to_string()),
    ]);
    for (query, pairs) in [("Q7", HashMap::new()), ("Q10", filters)] {
        let a = registry.execute_raw(query, "A", &pairs).unwrap();
        let b = registry.execute_raw(query, "B", &pairs).unwrap();
        assert_eq!(a, b, "{query} differs between models");
        assert!(!a.is_empty(), "{query} returned nothing");
    }

    let q10 = registry
        .execute_raw(
            "Q10",
            "A",
            &HashMap::from([
                ("minReviews".to_string(), "2".to_string()),
                ("minRating".to_string(), "9".to_string()),
            ]),
        )
        .unwrap();
    assert_eq!(q10.len(), 1);
    let key = q10[0].get_document("_id").unwrap();
    assert_eq!(key.get_str("title").unwrap(), "Heat");
    assert_eq!(key.get_i32("year").unwrap(), 1995);
    assert_eq!(q10[0].get_i32("numReviews").unwrap(), 2);
}

// ── Loading ──────────────────────────────────────────────────────

#[test]
fn loads_json_lines_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{"movie_title":"Heat","username":"ann","rating":8,"review_content":"Tense","review_date":"2020-02-03"}}"#
    )
    .unwrap();
    writeln!(file).unwrap();
    writeln!(
        file,
        r#"{{"movie_title":"Heat","username":"bob","rating":"x","review_content":"Long","review_date":"2020-02-04"}}"#
    )
    .unwrap();

    let dataset = Dataset::load(file.path()).unwrap();
    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.skipped, 1);

    let store = store();
    let counts = ingest(&store, SchemaVariant::A, &dataset).unwrap();
    assert_eq!(
        counts,
        IngestCounts::Embedded { reviews: 1, unique_movies: 1, unique_users: 1 }
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Dataset::load(&dir.path().join("absent.jsonl")).unwrap_err();
    assert!(matches!(err, IngestError::Io(_)));
}
