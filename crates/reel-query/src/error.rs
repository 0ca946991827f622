use reel_store::StoreError;

use crate::query_id::QueryId;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("unknown query: {0}")]
    UnknownQuery(String),
    #[error("invalid model {0:?}: expected A or B")]
    InvalidVariant(String),
    #[error("invalid parameters for {query}: {message}")]
    InvalidParams { query: QueryId, message: String },
    #[error("query execution failed: {0}")]
    Execution(#[from] StoreError),
}

impl QueryError {
    pub(crate) fn params(query: QueryId, message: impl Into<String>) -> Self {
        QueryError::InvalidParams {
            query,
            message: message.into(),
        }
    }
}
