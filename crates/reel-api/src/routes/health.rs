use axum::Json;
use chrono::Utc;
use serde_json::{Value, json};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "reel-api is running",
        "timestamp": Utc::now(),
        "version": VERSION,
    }))
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "reel-api",
        "version": VERSION,
        "endpoints": {
            "health": "GET /health",
            "queries": "GET /api/v1/queries/{id}?model=A|B",
            "benchmarks": "GET /api/v1/benchmarks",
            "ingest": "POST /api/v1/ingest?model=A|B",
            "stats": "GET /api/v1/stats",
        },
    }))
}
