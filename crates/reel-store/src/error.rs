use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    InvalidFilter(String),
    InvalidPipeline(String),
    InvalidIndex(String),
    /// An index with the same name but a different specification already exists.
    IndexConflict { name: String },
    DuplicateKey { index: String, key: String },
    NamespaceNotFound(String),
    Storage(String),
}

impl StoreError {
    /// True for the "index already exists" family of conditions.
    pub fn is_index_exists(&self) -> bool {
        matches!(self, StoreError::IndexConflict { .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidFilter(msg) => write!(f, "invalid filter: {msg}"),
            StoreError::InvalidPipeline(msg) => write!(f, "invalid pipeline: {msg}"),
            StoreError::InvalidIndex(msg) => write!(f, "invalid index: {msg}"),
            StoreError::IndexConflict { name } => {
                write!(f, "index already exists with different options: {name}")
            }
            StoreError::DuplicateKey { index, key } => {
                write!(f, "duplicate key on index {index}: {key}")
            }
            StoreError::NamespaceNotFound(name) => write!(f, "ns not found: {name}"),
            StoreError::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}
