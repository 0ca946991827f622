use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reel_query::{QueryId, SchemaVariant};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::info;

use crate::error::BenchError;
use crate::summary::CellSummary;

/// Where the benchmark ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Environment {
    #[serde(rename = "crate")]
    pub crate_name: String,
    pub version: String,
    pub os: String,
    pub arch: String,
    pub store: String,
}

impl Environment {
    pub fn current(store: &str) -> Self {
        Self {
            crate_name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            store: store.to_string(),
        }
    }
}

/// Cells of one index state, serialized as `{ modelA: { Q1: …, … }, modelB: … }`
/// in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassResults {
    pub cells: Vec<CellSummary>,
}

impl PassResults {
    pub fn get(&self, model: SchemaVariant, query: QueryId) -> Option<&CellSummary> {
        self.cells
            .iter()
            .find(|c| c.model == model && c.query_id == query)
    }

    fn model(&self, model: SchemaVariant) -> ModelCells<'_> {
        ModelCells(self.cells.iter().filter(|c| c.model == model).collect())
    }
}

struct ModelCells<'a>(Vec<&'a CellSummary>);

impl Serialize for ModelCells<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for cell in &self.0 {
            map.serialize_entry(cell.query_id.as_str(), cell)?;
        }
        map.end()
    }
}

impl Serialize for PassResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SchemaVariant::ALL.len()))?;
        for variant in SchemaVariant::ALL {
            map.serialize_entry(variant.model_key(), &self.model(variant))?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    pub timestamp: DateTime<Utc>,
    pub environment: Environment,
    pub with_indexes: PassResults,
    pub without_indexes: PassResults,
}

impl BenchmarkReport {
    pub fn cell_count(&self) -> usize {
        self.with_indexes.cells.len() + self.without_indexes.cells.len()
    }
}

/// `benchmarks-YYYY-MM-DD.json`, dated by the report's UTC timestamp.
pub fn report_file_name(report: &BenchmarkReport) -> String {
    format!("benchmarks-{}.json", report.timestamp.format("%Y-%m-%d"))
}

/// Write the report as pretty JSON into `dir`, replacing any report from the
/// same day.
pub fn persist_report(dir: &Path, report: &BenchmarkReport) -> Result<PathBuf, BenchError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(report));
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json)?;
    info!(path = %path.display(), cells = report.cell_count(), "benchmark report written");
    Ok(path)
}

/// Side-by-side medians for every query, model and index state.
pub fn render_table(report: &BenchmarkReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<6} {:>14} {:>14} {:>14} {:>14}",
        "query", "A indexed", "B indexed", "A no index", "B no index"
    );
    for query in QueryId::ALL {
        let _ = write!(out, "  {:<6}", query.as_str());
        for pass in [&report.with_indexes, &report.without_indexes] {
            for variant in SchemaVariant::ALL {
                match pass.get(variant, query) {
                    Some(cell) => {
                        let _ = write!(out, " {:>12.2}ms", cell.median);
                    }
                    None => {
                        let _ = write!(out, " {:>14}", "-");
                    }
                }
            }
        }
        out.push('\n');
    }
    out
}
