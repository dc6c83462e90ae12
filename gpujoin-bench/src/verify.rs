//! Output verification and the mismatch log.
//!
//! The device output is correct only if every output id equals the
//! reference id at the same row. Mismatches are data, not errors: they are
//! collected into an [`ErrorReport`] and written to `gpujoin-errors.log`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use gpujoin_runtime::TableRow;
use serde::Serialize;

use crate::catalog::TableSetId;

/// One differing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchRow {
    pub row: usize,
    pub reference_id: u32,
    pub device_id: u32,
    pub reference_text: String,
}

/// Differences found for one table set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub set: TableSetId,
    pub mismatches: Vec<MismatchRow>,
    /// Rows present in only one of the two columns.
    pub unpaired_rows: usize,
}

impl ErrorReport {
    pub fn mismatch_count(&self) -> usize {
        self.mismatches.len() + self.unpaired_rows
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Equal,
    Mismatch(ErrorReport),
}

impl MatchResult {
    pub fn is_equal(&self) -> bool {
        matches!(self, MatchResult::Equal)
    }
}

/// Compare `device_ids` with the reference key column, row by row.
pub fn verify(set: TableSetId, device_ids: &[u32], reference: &[TableRow]) -> MatchResult {
    let mismatches: Vec<MismatchRow> = device_ids
        .iter()
        .zip(reference)
        .enumerate()
        .filter(|(_, (&dev, r))| dev != r.id)
        .map(|(row, (&device_id, r))| MismatchRow {
            row,
            reference_id: r.id,
            device_id,
            reference_text: r.text_lossy(),
        })
        .collect();
    let unpaired_rows = device_ids.len().abs_diff(reference.len());

    if mismatches.is_empty() && unpaired_rows == 0 {
        MatchResult::Equal
    } else {
        MatchResult::Mismatch(ErrorReport {
            set,
            mismatches,
            unpaired_rows,
        })
    }
}

/// Mismatch log, created (truncated) on the first report of a batch and
/// appended to for every later one.
pub struct ErrorLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any report has been written.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Append `report`'s rows.
    pub fn record(&mut self, report: &ErrorReport) -> std::io::Result<()> {
        let mut w = match self.writer.take() {
            Some(w) => w,
            None => self.create()?,
        };
        let result = write_report(&mut w, report);
        self.writer = Some(w);
        result
    }

    fn create(&self) -> std::io::Result<BufWriter<File>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut w = BufWriter::new(File::create(&self.path)?);
        writeln!(
            w,
            "** gpujoin error log - {}.",
            chrono::Local::now().format("%a %b %e %H:%M:%S %Y")
        )?;
        Ok(w)
    }
}

fn write_report(w: &mut impl Write, report: &ErrorReport) -> std::io::Result<()> {
    writeln!(w, "\n\n# Table set {} errors\n", report.set)?;
    writeln!(
        w,
        "{:^8}  {:<9}  {:<9}  {:<8}",
        "row", "ref pg_id", "GPU pg_id", "pg_title"
    )?;
    writeln!(w, "--------  ---------  ---------  ---------")?;
    for m in &report.mismatches {
        writeln!(
            w,
            "{:>8}  {:<9}  {:<9}  {:<60}",
            m.row, m.reference_id, m.device_id, m.reference_text
        )?;
    }
    if report.unpaired_rows > 0 {
        writeln!(w, "# {} unpaired rows", report.unpaired_rows)?;
    }
    w.flush()
}
