use std::path::PathBuf;
use std::sync::Arc;

use reel_bench::{BenchmarkHarness, DEFAULT_REPETITIONS, persist_report, render_table};
use reel_ingest::{DatasetSource, ingest};
use reel_query::{IndexManager, QueryRegistry, SchemaVariant};
use reel_store::{DocumentStore, MemoryStore};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let report_dir = PathBuf::from(std::env::var("REEL_REPORT_DIR").unwrap_or_else(|_| "benchmarks".into()));
    let repetitions: usize = std::env::var("REEL_BENCH_REPETITIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_REPETITIONS);
    let source = DatasetSource::from_env();

    println!("=== Reel Benchmark Suite ===\n");

    let dataset = source.load().unwrap_or_else(|e| {
        eprintln!("failed to load dataset {source:?}: {e}");
        std::process::exit(1);
    });

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    for variant in SchemaVariant::ALL {
        match ingest(&store, variant, &dataset) {
            Ok(counts) => println!("  model {variant}: {counts:?}"),
            Err(e) => {
                eprintln!("failed to ingest model {variant}: {e}");
                std::process::exit(1);
            }
        }
    }
    println!();

    let registry = Arc::new(QueryRegistry::new(Arc::clone(&store)));
    let harness = BenchmarkHarness::new(registry, IndexManager::new(store)).with_repetitions(repetitions);
    let report = harness.run().unwrap_or_else(|e| {
        eprintln!("benchmark failed: {e}");
        std::process::exit(1);
    });

    print!("{}", render_table(&report));
    println!();

    match persist_report(&report_dir, &report) {
        Ok(path) => println!("Report written to {}", path.display()),
        Err(e) => {
            eprintln!("failed to write report to {}: {e}", report_dir.display());
            std::process::exit(1);
        }
    }
}
