use std::sync::Arc;

use reel_query::{IndexManager, QueryRegistry};
use reel_store::DocumentStore;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::Config;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub registry: Arc<QueryRegistry>,
    pub config: Arc<Config>,
    /// Held by whichever benchmark or ingestion currently owns index state.
    exclusive: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self {
            registry: Arc::new(QueryRegistry::new(Arc::clone(&store))),
            store,
            config: Arc::new(config),
            exclusive: Arc::new(Mutex::new(())),
        }
    }

    pub fn index_manager(&self) -> IndexManager {
        IndexManager::new(Arc::clone(&self.store))
    }

    /// Claim the store's index state, or fail with `Busy` if a benchmark or
    /// ingestion already holds it.
    pub fn claim(&self, task: &'static str) -> Result<OwnedMutexGuard<()>, ApiError> {
        Arc::clone(&self.exclusive)
            .try_lock_owned()
            .map_err(|_| ApiError::Busy(task))
    }
}
