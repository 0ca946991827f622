use std::path::PathBuf;

use crate::dataset::Dataset;
use crate::error::IngestError;
use crate::synthetic;

pub const DEFAULT_SYNTHETIC_REVIEWS: usize = 2000;
pub const DEFAULT_SYNTHETIC_SEED: u64 = 42;

/// Where review data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    File(PathBuf),
    Synthetic { reviews: usize, seed: u64 },
}

impl DatasetSource {
    /// `REEL_DATASET` names a JSON-lines file; without it, synthetic data is
    /// generated from `REEL_SYNTHETIC_REVIEWS` and `REEL_SYNTHETIC_SEED`.
    pub fn from_env() -> Self {
        if let Some(path) = std::env::var_os("REEL_DATASET").filter(|p| !p.is_empty()) {
            return DatasetSource::File(PathBuf::from(path));
        }
        DatasetSource::Synthetic {
            reviews: env_number("REEL_SYNTHETIC_REVIEWS").unwrap_or(DEFAULT_SYNTHETIC_REVIEWS),
            seed: env_number("REEL_SYNTHETIC_SEED").unwrap_or(DEFAULT_SYNTHETIC_SEED),
        }
    }

    pub fn load(&self) -> Result<Dataset, IngestError> {
        match self {
            DatasetSource::File(path) => Dataset::load(path),
            DatasetSource::Synthetic { reviews, seed } => Ok(synthetic::generate(*reviews, *seed)),
        }
    }
}

impl Default for DatasetSource {
    fn default() -> Self {
        DatasetSource::Synthetic {
            reviews: DEFAULT_SYNTHETIC_REVIEWS,
            seed: DEFAULT_SYNTHETIC_SEED,
        }
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
