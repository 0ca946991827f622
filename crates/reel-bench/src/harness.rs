use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use reel_query::{IndexManager, QueryId, QueryParams, QueryRegistry, SchemaVariant};
use tracing::{debug, info, warn};

use crate::error::BenchError;
use crate::report::{BenchmarkReport, Environment, PassResults};
use crate::summary::{CellSummary, millis};

pub const DEFAULT_REPETITIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexState {
    With,
    Without,
}

/// Times every query on both models, with and without secondary indexes.
///
/// Cells run strictly one after another: one warmup execution, then
/// `repetitions` timed executions with the query's fixed sample parameters.
/// The store is always left indexed, even when a query fails.
pub struct BenchmarkHarness {
    registry: Arc<QueryRegistry>,
    indexes: IndexManager,
    repetitions: usize,
}

impl BenchmarkHarness {
    pub fn new(registry: Arc<QueryRegistry>, indexes: IndexManager) -> Self {
        Self {
            registry,
            indexes,
            repetitions: DEFAULT_REPETITIONS,
        }
    }

    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions.max(1);
        self
    }

    pub fn run(&self) -> Result<BenchmarkReport, BenchError> {
        let timestamp = Utc::now();
        let started = Instant::now();
        info!(repetitions = self.repetitions, "benchmark started");

        let outcome = self
            .pass(IndexState::With)
            .and_then(|with| Ok((with, self.pass(IndexState::Without)?)));
        self.restore_indexes();
        let (with_indexes, without_indexes) = outcome?;

        let report = BenchmarkReport {
            timestamp,
            environment: Environment::current(self.registry.store().engine()),
            with_indexes,
            without_indexes,
        };
        info!(
            cells = report.cell_count(),
            elapsed_ms = millis(started.elapsed()),
            "benchmark finished"
        );
        Ok(report)
    }

    fn pass(&self, state: IndexState) -> Result<PassResults, BenchError> {
        for variant in SchemaVariant::ALL {
            match state {
                IndexState::With => {
                    self.indexes.create_indexes(variant);
                }
                IndexState::Without => {
                    let report = self.indexes.drop_indexes(variant);
                    if !report.warnings.is_empty() {
                        warn!(model = %variant, warnings = report.warnings.len(), "indexes not fully dropped");
                    }
                }
            }
        }

        let mut results = PassResults::default();
        for variant in SchemaVariant::ALL {
            for query in QueryId::ALL {
                let cell = self.cell(query, variant)?;
                debug!(?state, query = %query, model = %variant, median_ms = cell.median, "cell measured");
                results.cells.push(cell);
            }
        }
        Ok(results)
    }

    fn cell(&self, query: QueryId, variant: SchemaVariant) -> Result<CellSummary, BenchError> {
        let params = QueryParams::sample(query);
        self.registry.execute(query, variant, &params)?;

        let mut samples = Vec::with_capacity(self.repetitions);
        for _ in 0..self.repetitions {
            let started = Instant::now();
            self.registry.execute(query, variant, &params)?;
            samples.push(millis(started.elapsed()));
        }
        Ok(CellSummary::new(query, variant, samples))
    }

    fn restore_indexes(&self) {
        for variant in SchemaVariant::ALL {
            let report = self.indexes.create_indexes(variant);
            if !report.warnings.is_empty() {
                warn!(model = %variant, warnings = report.warnings.len(), "indexes not fully restored");
            }
        }
    }
}
