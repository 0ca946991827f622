use std::path::PathBuf;

use reel_bench::DEFAULT_REPETITIONS;
use reel_ingest::DatasetSource;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub report_dir: PathBuf,
    pub dataset: DatasetSource,
    pub repetitions: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            addr: std::env::var("REEL_API_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            report_dir: std::env::var("REEL_REPORT_DIR")
                .unwrap_or_else(|_| "benchmarks".into())
                .into(),
            dataset: DatasetSource::from_env(),
            repetitions: std::env::var("REEL_BENCH_REPETITIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REPETITIONS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".into(),
            report_dir: "benchmarks".into(),
            dataset: DatasetSource::default(),
            repetitions: DEFAULT_REPETITIONS,
        }
    }
}
