use reel_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
