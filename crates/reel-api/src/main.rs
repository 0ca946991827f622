use std::sync::Arc;

use reel_ingest::ingest;
use reel_query::SchemaVariant;
use reel_store::{DocumentStore, MemoryStore};
use tracing_subscriber::EnvFilter;

use reel_api::config::Config;
use reel_api::routes;
use reel_api::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

    let dataset = config.dataset.load().unwrap_or_else(|e| {
        eprintln!("failed to load dataset {:?}: {e}", config.dataset);
        std::process::exit(1);
    });
    for variant in SchemaVariant::ALL {
        if let Err(e) = ingest(&store, variant, &dataset) {
            eprintln!("failed to seed model {variant}: {e}");
            std::process::exit(1);
        }
    }

    let addr = config.addr.clone();
    let app = routes::router().with_state(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("failed to bind {addr}: {e}");
            std::process::exit(1);
        });

    tracing::info!(reviews = dataset.len(), "reel-api listening on {addr}");
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}
