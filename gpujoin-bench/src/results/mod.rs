//! Results recorder: per-set metrics and mismatch reports for one batch,
//! plus the record and baseline file formats.

pub mod baseline;
pub mod literal;
pub mod record;

use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::TableSetId;
use crate::verify::ErrorReport;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

/// Timing for one table set, in seconds at full precision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetrics {
    pub set: TableSetId,
    /// Mean device-reported kernel time.
    pub device_time: f64,
    /// Mean host wall time per run (enqueue through read-back).
    pub wall_time: f64,
    pub left_rows: usize,
    /// Lookup rows as seen by the kernel, padding included.
    pub lookup_rows: usize,
    /// Device time of each executed run.
    pub device_samples: Vec<f64>,
}

impl RunMetrics {
    pub fn new(
        set: TableSetId,
        device_time: f64,
        wall_time: f64,
        left_rows: usize,
        lookup_rows: usize,
    ) -> Self {
        Self {
            set,
            device_time,
            wall_time,
            left_rows,
            lookup_rows,
            device_samples: Vec::new(),
        }
    }
}

/// Accumulates the batch's metrics (processing order) and mismatch reports.
#[derive(Debug, Default)]
pub struct ResultsRecorder {
    metrics: Vec<RunMetrics>,
    errors: Vec<ErrorReport>,
}

impl ResultsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_metrics(&mut self, metrics: RunMetrics) {
        self.metrics.push(metrics);
    }

    pub fn record_mismatch(&mut self, report: ErrorReport) {
        self.errors.push(report);
    }

    /// Number of sets whose output did not match the reference.
    pub fn mismatched_sets(&self) -> usize {
        self.errors.len()
    }

    pub fn into_parts(self) -> (Vec<RunMetrics>, Vec<ErrorReport>) {
        (self.metrics, self.errors)
    }
}
