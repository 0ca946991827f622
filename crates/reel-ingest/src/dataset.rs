use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::error::IngestError;
use crate::record::{CleanReview, RawReview};

/// A cleaned review with its movie, user and review identifiers resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: String,
    pub movie_id: String,
    pub user_id: String,
    pub data: CleanReview,
}

/// Hands out one identifier per key, preferring the source's own id unless
/// another key already claimed it.
struct IdAssigner {
    prefix: &'static str,
    by_key: HashMap<String, String>,
    taken: HashSet<String>,
}

impl IdAssigner {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            by_key: HashMap::new(),
            taken: HashSet::new(),
        }
    }

    fn assign(&mut self, key: &str, source_id: Option<&str>) -> String {
        if let Some(id) = self.by_key.get(key) {
            return id.clone();
        }
        let id = match source_id {
            Some(id) if !self.taken.contains(id) => id.to_string(),
            _ => {
                let mut n = self.by_key.len() + 1;
                loop {
                    let candidate = format!("{}_{n}", self.prefix);
                    if !self.taken.contains(&candidate) {
                        break candidate;
                    }
                    n += 1;
                }
            }
        };
        self.taken.insert(id.clone());
        self.by_key.insert(key.to_string(), id.clone());
        id
    }
}

/// Cleaned reviews ready to be shaped into either model.
///
/// Movies are identified by title and users by username, so every title maps
/// to exactly one movie id and every username to exactly one user id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub reviews: Vec<Review>,
    pub skipped: usize,
}

impl Dataset {
    pub fn from_records(records: impl IntoIterator<Item = RawReview>) -> Self {
        let mut movies = IdAssigner::new("m");
        let mut users = IdAssigner::new("u");
        let mut dataset = Dataset::default();

        for (row, raw) in records.into_iter().enumerate() {
            let data = match raw.clean() {
                Ok(data) => data,
                Err(reason) => {
                    debug!(row, ?reason, "skipping review");
                    dataset.skipped += 1;
                    continue;
                }
            };
            let movie_id = movies.assign(&data.movie_title, data.movie_id.as_deref());
            let user_id = users.assign(&data.username, data.user_id.as_deref());
            dataset.reviews.push(Review {
                id: format!("r{}", dataset.reviews.len() + 1),
                movie_id,
                user_id,
                data,
            });
        }
        dataset
    }

    /// Read JSON lines. Blank lines are ignored; a malformed line fails the
    /// whole read.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, IngestError> {
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|source| IngestError::Parse {
                line: index + 1,
                source,
            })?;
            records.push(record);
        }
        Ok(Self::from_records(records))
    }

    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let file = File::open(path)?;
        let dataset = Self::from_reader(BufReader::new(file))?;
        info!(
            path = %path.display(),
            reviews = dataset.reviews.len(),
            skipped = dataset.skipped,
            "dataset loaded"
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}
