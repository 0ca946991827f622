mod error;
mod harness;
mod report;
mod summary;

pub use error::BenchError;
pub use harness::{BenchmarkHarness, DEFAULT_REPETITIONS};
pub use report::{
    BenchmarkReport, Environment, PassResults, persist_report, render_table, report_file_name,
};
pub use summary::{CellSummary, summarize};
