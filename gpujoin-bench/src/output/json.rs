//! JSON export of a batch: per-set metrics with run statistics, mismatch
//! counts, and run parameters.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::batch::BatchRun;
use crate::catalog::TableSetId;
use crate::results::RunMetrics;
use crate::stats::{compute_stats, Stats};

#[derive(Serialize)]
struct JsonReport<'a> {
    timestamp: String,
    device: DeviceHeader<'a>,
    runs_per_set: u32,
    lookup_table: Option<String>,
    early_termination: bool,
    results: Vec<SetEntry<'a>>,
    mismatches: Vec<MismatchEntry>,
}

#[derive(Serialize)]
struct DeviceHeader<'a> {
    platform: &'a str,
    device: &'a str,
}

#[derive(Serialize)]
struct SetEntry<'a> {
    #[serde(flatten)]
    metrics: &'a RunMetrics,
    device_stats: Stats,
}

#[derive(Serialize)]
struct MismatchEntry {
    set: TableSetId,
    mismatched_rows: usize,
}

pub fn to_json(run: &BatchRun) -> Result<String, serde_json::Error> {
    let report = JsonReport {
        timestamp: chrono::Utc::now().to_rfc3339(),
        device: DeviceHeader {
            platform: &run.device.platform,
            device: &run.device.device,
        },
        runs_per_set: run.runs,
        lookup_table: run.fixed_lookup.map(|pt| pt.lookup_table()),
        early_termination: run.early_termination,
        results: run
            .metrics
            .iter()
            .map(|m| SetEntry {
                metrics: m,
                device_stats: compute_stats(&m.device_samples),
            })
            .collect(),
        mismatches: run
            .errors
            .iter()
            .map(|e| MismatchEntry {
                set: e.set,
                mismatched_rows: e.mismatch_count(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&report)
}

/// Write the batch to `path` as pretty-printed JSON.
pub fn write_json(path: &Path, run: &BatchRun) -> Result<(), String> {
    let json = to_json(run).map_err(|e| format!("JSON serialization failed: {}", e))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create directory {}: {}", parent.display(), e))?;
        }
    }

    fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::ErrorReport;
    use gpujoin_runtime::DeviceInfo;

    fn run() -> BatchRun {
        let mut m = RunMetrics::new(TableSetId::S208K, 0.5, 0.75, 16, 16);
        m.device_samples = vec![0.4, 0.6];
        BatchRun {
            device: DeviceInfo {
                platform: "host".into(),
                device: "cpu".into(),
            },
            runs: 2,
            fixed_lookup: None,
            full_catalog: false,
            processed: vec![TableSetId::S208K, TableSetId::S416K],
            pairs: Vec::new(),
            metrics: vec![m],
            errors: vec![ErrorReport {
                set: TableSetId::S416K,
                mismatches: Vec::new(),
                unpaired_rows: 3,
            }],
            early_termination: false,
        }
    }

    #[test]
    fn test_json_fields() {
        let v: serde_json::Value = serde_json::from_str(&to_json(&run()).unwrap()).unwrap();
        assert_eq!(v["runs_per_set"], 2);
        assert_eq!(v["results"][0]["set"], "208K");
        assert_eq!(v["results"][0]["device_time"], 0.5);
        assert_eq!(v["results"][0]["device_stats"]["sample_count"], 2);
        assert_eq!(v["mismatches"][0]["set"], "416K");
        assert_eq!(v["mismatches"][0]["mismatched_rows"], 3);
        assert!(v["timestamp"].is_string());
    }

    #[test]
    fn test_write_json_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.json");
        write_json(&path, &run()).unwrap();
        assert!(path.exists());
    }
}
