use reel_query::QueryError;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("benchmark query failed: {0}")]
    Query(#[from] QueryError),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}
