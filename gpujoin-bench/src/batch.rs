//! Batch orchestration: processes the configured sets strictly in order,
//! then persists and reports the results.

use std::path::PathBuf;

use gpujoin_runtime::{DeviceInfo, JoinDevice};
use tracing::{error, info, warn};

use crate::catalog::{resolve, TableSetId, TableTriple};
use crate::config::{default_baseline, BatchConfig, ReportConfig};
use crate::error::BenchError;
use crate::loader;
use crate::output::json::write_json;
use crate::output::progress::BatchProgress;
use crate::output::timefmt::human_duration;
use crate::output::table::render_summary;
use crate::results::baseline::{lookup_from_file_name, Baseline};
use crate::results::record::{archive_name, persist, RecordFile, RecordHeader};
use crate::results::{ResultsRecorder, RunMetrics};
use crate::scheduler::SetScheduler;
use crate::verify::{verify, ErrorLog, ErrorReport, MatchResult};

/// Log target for the summary table; the console layer filters it out
/// because the table is printed to stdout directly.
pub const SUMMARY_TARGET: &str = "summary";

/// Everything a finished (or early-terminated) batch produced.
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub device: DeviceInfo,
    pub runs: u32,
    pub fixed_lookup: Option<TableSetId>,
    pub full_catalog: bool,
    /// Sets that reached verification, in processing order.
    pub processed: Vec<TableSetId>,
    pub pairs: Vec<TableTriple>,
    pub metrics: Vec<RunMetrics>,
    pub errors: Vec<ErrorReport>,
    pub early_termination: bool,
}

impl BatchRun {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn record_file(&self) -> RecordFile {
        RecordFile::from_metrics(&self.metrics)
    }

    pub fn record_header(&self) -> RecordHeader {
        RecordHeader {
            created: chrono::Local::now(),
            runs: self.runs,
            pairs: self.pairs.clone(),
        }
    }

    pub fn archive_name(&self) -> Option<String> {
        archive_name(self.full_catalog, self.fixed_lookup, self.runs)
    }
}

/// How the batch ended, for the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Clean,
    Mismatched,
}

fn log_banner(config: &BatchConfig, device: &DeviceInfo) {
    info!("Platform: {}", device.platform);
    info!("Device: {}", device.device);
    if let Some(pt) = config.fixed_lookup {
        info!("Page table: {} (fixed for all joins)", pt.lookup_table());
    }
    let labels: Vec<&str> = config.sets.iter().map(|s| s.label()).collect();
    info!("Table sets: {}", labels.join(", "));
    info!("GPU runs per table set: {}", config.runs.get());
    info!("Work-group shape: {:?}", config.local_size);
}

/// Load, join, and verify every configured set.
///
/// Resource errors (missing table, allocation, launch) end the batch with an
/// error. Mismatching sets are collected; the batch stops early once
/// `max_mismatched_sets` sets have mismatched.
pub fn run_batch<D: JoinDevice>(config: &BatchConfig, device: &D) -> Result<BatchRun, BenchError> {
    let info = device.info();
    log_banner(config, &info);

    let mut recorder = ResultsRecorder::new();
    let mut error_log = ErrorLog::new(config.error_log_path());
    let mut processed = Vec::with_capacity(config.sets.len());
    let mut pairs = Vec::with_capacity(config.sets.len());
    let mut early_termination = false;
    let block = config.local_size.0 * config.local_size.1;

    let progress = BatchProgress::new(config.sets.len(), !config.verbose);

    for &set in &config.sets {
        let title = format!("Table set: {}", set);
        info!("");
        info!("{}", title);
        info!("{}", "-".repeat(title.len()));
        progress.update(&format!("{}: loading", set));

        let triple = resolve(set, config.fixed_lookup);
        let loaded = loader::load(
            &triple,
            &config.tables_dir,
            config.source_format,
            config.make_cache,
        )
        .map_err(|source| BenchError::Load { set, source })?;
        let loader::LoadedSet {
            mut left,
            mut lookup,
            reference,
            load_time,
        } = loaded;
        info!("Tables loaded ({})", human_duration(load_time.as_secs_f64()));

        let added = lookup.pad_to_multiple(block);
        if added > 0 {
            info!("{}: {} null rows appended ({} rows)", lookup.name, added, lookup.len());
        }

        progress.update(&format!("{}: joining", set));
        let mut scheduler = SetScheduler::new(set, config.runs, config.local_size);
        let outcome = scheduler
            .run(device, &mut left, &lookup)
            .map_err(|source| BenchError::Device { set, source })?;

        let result = verify(set, &left.ids(), &reference.rows);
        info!(" output == reference: {}", result.is_equal());

        recorder.record_metrics(outcome.metrics);
        processed.push(set);
        pairs.push(triple);
        progress.advance();

        if let MatchResult::Mismatch(report) = result {
            warn!(
                "table set {}: {} rows differ from {}",
                set,
                report.mismatch_count(),
                reference.name
            );
            error_log
                .record(&report)
                .map_err(|e| BenchError::io(error_log.path(), e))?;
            recorder.record_mismatch(report);
            if recorder.mismatched_sets() >= config.max_mismatched_sets {
                early_termination = true;
                warn!(
                    "{} table sets mismatched; stopping the batch",
                    recorder.mismatched_sets()
                );
                break;
            }
        }
    }
    progress.finish();

    let (metrics, errors) = recorder.into_parts();
    Ok(BatchRun {
        device: info,
        runs: config.runs.get(),
        fixed_lookup: config.fixed_lookup,
        full_catalog: config.is_full_catalog(),
        processed,
        pairs,
        metrics,
        errors,
        early_termination,
    })
}

/// Print the summary table to stdout and the run log.
fn emit_summary(text: &str) {
    println!("\n{}", text);
    info!(target: SUMMARY_TARGET, "\n{}", text);
}

/// Summary text with the baseline rows when `baseline_path` exists and
/// parses.
pub fn summarize(record: &RecordFile, baseline_path: &std::path::Path) -> String {
    let name = baseline_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| baseline_path.display().to_string());
    let (baseline, missing) = match Baseline::load(baseline_path) {
        Ok(Some(b)) => (Some(b), None),
        Ok(None) => (None, Some(format!("{} was not found", name))),
        Err(e) => {
            warn!("ignoring baseline: {}", e);
            (None, Some(format!("{} could not be read", name)))
        }
    };
    let mut text = render_summary(record, baseline.as_ref());
    if let Some(reason) = missing {
        text.push_str(&format!("\n\nBaseline data not included. {}", reason));
    }
    text
}

/// Persist and report a finished batch.
///
/// The record file is written only when every set matched. A persistence
/// failure is returned after the summary has been printed.
pub fn finish(config: &BatchConfig, run: &BatchRun) -> Result<BatchOutcome, BenchError> {
    if let Some(path) = &config.json_path {
        match write_json(path, run) {
            Ok(()) => info!("JSON results written to {}", path.display()),
            Err(e) => warn!("{}", e),
        }
    }

    if run.has_errors() {
        error!("GPU output had errors:");
        for report in &run.errors {
            error!(" Table set {}: {} errors", report.set, report.mismatch_count());
        }
        error!("Errors written to {}", config.error_log_path().display());
        return Ok(BatchOutcome::Mismatched);
    }

    info!("GPU table join(s) completed with no errors.");
    let record = run.record_file();
    let archive = run.archive_name();
    let persisted = persist(
        &record,
        &run.record_header(),
        &config.output_dir,
        archive.as_deref(),
    );
    match &persisted {
        Ok(paths) => {
            let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            info!("Execution data written to {}", names.join(" & "));
        }
        Err(e) => error!("could not write execution data: {}", e),
    }

    emit_summary(&summarize(&record, &config.resolved_baseline()));

    persisted?;
    Ok(BatchOutcome::Clean)
}

/// Reprint the summary of a saved record file.
pub fn report(config: &ReportConfig) -> Result<String, BenchError> {
    let record = RecordFile::read(&config.record_path)?;
    let fixed = config
        .record_path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(lookup_from_file_name);
    let baseline: PathBuf = config
        .baseline_path
        .clone()
        .unwrap_or_else(|| default_baseline(&config.output_dir, fixed));
    let text = summarize(&record, &baseline);
    emit_summary(&text);
    Ok(text)
}
