use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use reel_api::config::Config;
use reel_api::routes;
use reel_api::state::AppState;
use reel_ingest::{DatasetSource, ingest, synthetic};
use reel_query::SchemaVariant;
use reel_store::{DocumentStore, MemoryStore};
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt;

fn setup() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let dataset = synthetic::generate(300, 3);
    for variant in SchemaVariant::ALL {
        ingest(&store, variant, &dataset).unwrap();
    }
    let config = Config {
        addr: "127.0.0.1:0".into(),
        report_dir: dir.path().join("reports"),
        dataset: DatasetSource::Synthetic { reviews: 120, seed: 5 },
        repetitions: 1,
    };
    (AppState::new(store, config), dir)
}

fn app(state: &AppState) -> Router {
    routes::router().with_state(state.clone())
}

async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri).await
}

// ── Service info ─────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let (state, _dir) = setup();
    let (status, json) = get(app(&state), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "OK");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn index_lists_endpoints() {
    let (state, _dir) = setup();
    let (status, json) = get(app(&state), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "reel-api");
    assert!(json["endpoints"]["queries"].is_string());
}

#[tokio::test]
async fn stats_describe_both_models() {
    let (state, _dir) = setup();
    let (status, json) = get(app(&state), "/api/v1/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let models = json["models"].as_array().unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0]["model"], "A");
    assert_eq!(models[1]["model"], "B");

    let reviews_a = &models[0]["collections"][0];
    assert_eq!(reviews_a["name"], "reviews_a");
    assert_eq!(reviews_a["documents"], 300);
    let b_collections = models[1]["collections"].as_array().unwrap();
    assert_eq!(b_collections.len(), 3);
    assert_eq!(b_collections[0]["documents"], 300);

    let users = b_collections.iter().find(|c| c["name"] == "users_b").unwrap();
    let name_index = users["indexes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["name"] == "name_1")
        .unwrap();
    assert_eq!(name_index["unique"], true);
    assert_eq!(name_index["sparse"], false);
    assert_eq!(name_index["keys"]["name"], 1);
}

// ── Query execution ──────────────────────────────────────────────

#[tokio::test]
async fn executes_query_on_either_model() {
    let (state, _dir) = setup();
    let uri = "/api/v1/queries/Q1?model=A&title=The%20Dark%20Knight&limit=5";
    let (status, a) = get(app(&state), uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(a["success"], true);
    assert_eq!(a["queryId"], "Q1");
    assert_eq!(a["model"], "A");
    assert!(a["timing"]["elapsedMs"].is_number());
    let returned = a["result"]["docsReturned"].as_u64().unwrap();
    assert!(returned >= 1 && returned <= 5);
    assert_eq!(a["result"]["data"].as_array().unwrap().len() as u64, returned);

    let (status, b) = get(app(&state), &uri.replace("model=A", "model=b")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(b["model"], "B");
    assert_eq!(a["result"]["data"], b["result"]["data"]);
}

#[tokio::test]
async fn query_ids_are_case_insensitive() {
    let (state, _dir) = setup();
    let (status, json) = get(app(&state), "/api/v1/queries/q5?model=B").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["queryId"], "Q5");
    assert_eq!(json["result"]["docsReturned"], 10);
}

#[tokio::test]
async fn lookup_miss_is_an_empty_success() {
    let (state, _dir) = setup();
    let (status, json) = get(app(&state), "/api/v1/queries/Q8?model=B&title=Nonexistent").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["result"]["docsReturned"], 0);
}

#[tokio::test]
async fn rejects_bad_requests() {
    let (state, _dir) = setup();
    for (uri, expected) in [
        ("/api/v1/queries/Q1?title=Heat", StatusCode::BAD_REQUEST),
        ("/api/v1/queries/Q1?model=C&title=Heat", StatusCode::BAD_REQUEST),
        ("/api/v1/queries/Q1?model=A", StatusCode::BAD_REQUEST),
        ("/api/v1/queries/Q4?model=A&limit=many", StatusCode::BAD_REQUEST),
        ("/api/v1/queries/Q11?model=A", StatusCode::NOT_FOUND),
    ] {
        let (status, json) = get(app(&state), uri).await;
        assert_eq!(status, expected, "{uri}");
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }
}

// ── Benchmarks and ingestion ─────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn benchmark_runs_and_persists_report() {
    let (state, _dir) = setup();
    let (status, json) = get(app(&state), "/api/v1/benchmarks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["results"]["withIndexes"]["modelA"].as_object().unwrap().len(), 10);
    assert_eq!(json["results"]["withoutIndexes"]["modelB"].as_object().unwrap().len(), 10);
    assert!(json["timing"]["totalDurationMs"].is_number());

    let path = json["reportPath"].as_str().unwrap();
    assert!(std::path::Path::new(path).starts_with(&state.config.report_dir));
    assert!(std::path::Path::new(path).exists());
}

#[tokio::test]
async fn concurrent_runs_are_refused() {
    let (state, _dir) = setup();
    let _held = state.claim("test").ok().unwrap();

    let (status, json) = get(app(&state), "/api/v1/benchmarks").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);

    let (status, _) = send(app(&state), Method::POST, "/api/v1/ingest?model=A").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test(flavor = "multi_thread")]
async fn ingest_reloads_one_model() {
    let (state, _dir) = setup();
    let (status, json) = send(app(&state), Method::POST, "/api/v1/ingest?model=B").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["model"], "B");
    assert_eq!(json["counts"]["reviews"], 120);
    assert!(json["counts"]["movies"].as_u64().unwrap() > 0);

    let (status, _) = send(app(&state), Method::POST, "/api/v1/ingest?model=Z").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
