mod dataset;
mod error;
mod ingest;
mod model;
mod record;
mod source;
pub mod synthetic;

pub use dataset::{Dataset, Review};
pub use error::IngestError;
pub use ingest::{BATCH_SIZE, IngestCounts, ingest};
pub use model::{NormalizedDocuments, embedded_documents, normalized_documents};
pub use record::{CleanReview, Lenient, ListField, RawReview, Rejection};
pub use source::{DEFAULT_SYNTHETIC_REVIEWS, DEFAULT_SYNTHETIC_SEED, DatasetSource};
