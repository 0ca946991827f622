use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reel_bench::BenchError;
use reel_ingest::IngestError;
use reel_query::QueryError;
use tokio::task::JoinError;
use tracing::error;

pub enum ApiError {
    Query(QueryError),
    Bench(BenchError),
    Ingest(IngestError),
    Busy(&'static str),
    Internal(String),
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::Query(e)
    }
}

impl From<BenchError> for ApiError {
    fn from(e: BenchError) -> Self {
        ApiError::Bench(e)
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        ApiError::Ingest(e)
    }
}

impl From<JoinError> for ApiError {
    fn from(e: JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Query(e) => match e {
                QueryError::UnknownQuery(_) => (StatusCode::NOT_FOUND, e.to_string()),
                QueryError::InvalidVariant(_) | QueryError::InvalidParams { .. } => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                QueryError::Execution(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            },
            ApiError::Bench(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Ingest(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Busy(task) => (
                StatusCode::CONFLICT,
                format!("cannot start {task}: a benchmark or ingestion is already running"),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        if status.is_server_error() {
            error!(%status, error = %message, "request failed");
        }
        let body = serde_json::json!({ "success": false, "error": message });
        (status, Json(body)).into_response()
    }
}
