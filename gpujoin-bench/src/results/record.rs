//! The `.tms` record file.
//!
//! A block of `#` comment lines followed by exactly five literal-sequence
//! lines: set labels, device times, total times, left table sizes, lookup
//! table sizes. Times are seconds rounded to four decimals.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::literal::{format_floats, format_ints, format_strings, parse_sequence, Literal};
use super::{RecordError, RunMetrics};
use crate::catalog::{TableSetId, TableTriple};

/// Round to four decimals for persistence.
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Five parallel lists, one entry per processed set.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFile {
    pub sets: Vec<TableSetId>,
    pub device_times: Vec<f64>,
    pub total_times: Vec<f64>,
    pub left_sizes: Vec<u64>,
    pub lookup_sizes: Vec<u64>,
}

/// Descriptive comment block written above the lists.
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub created: DateTime<Local>,
    pub runs: u32,
    pub pairs: Vec<TableTriple>,
}

impl RecordFile {
    /// Build from batch metrics, rounding times.
    pub fn from_metrics(metrics: &[RunMetrics]) -> Self {
        Self {
            sets: metrics.iter().map(|m| m.set).collect(),
            device_times: metrics.iter().map(|m| round4(m.device_time)).collect(),
            total_times: metrics.iter().map(|m| round4(m.wall_time)).collect(),
            left_sizes: metrics.iter().map(|m| m.left_rows as u64).collect(),
            lookup_sizes: metrics.iter().map(|m| m.lookup_rows as u64).collect(),
        }
    }

    /// Full file text: header comments then the five lists.
    pub fn render(&self, header: &RecordHeader) -> String {
        let rule = format!("#{}", "-".repeat(78));
        let title = "# GPU Processing Times";
        let mut out = String::new();
        out.push_str(&rule);
        out.push('\n');
        out.push_str(title);
        out.push_str(&format!("\n# {}\n", "=".repeat(title.len() - 2)));
        out.push_str(&format!("# {}\n", header.created.format("%a %b %e %H:%M:%S %Y")));
        out.push_str(&format!("#\n# GPU runs per table set: {}\n", header.runs));
        out.push_str("# Join input pairs:\n#  ");
        for (i, t) in header.pairs.iter().enumerate() {
            out.push_str(&format!("('{}', '{}')", t.left, t.lookup));
            if i + 1 == header.pairs.len() {
                break;
            }
            if (i + 1) % 3 == 0 {
                out.push_str(",\n#  ");
            } else {
                out.push_str(", ");
            }
        }
        out.push_str("\n#\n# Output lists:\n");
        out.push_str("#  1. tblsets[]\n");
        if header.runs == 1 {
            out.push_str("#  2. device_time[] (sec)\n#  3. total_time[] (sec)\n");
        } else {
            out.push_str("#  2. avg_device_time[] (sec)\n#  3. avg_total_time[] (sec)\n");
        }
        out.push_str("#  4. linkpage_table_size[] (rows)\n");
        out.push_str("#  5. page_table_size[] (rows)\n");
        out.push_str(&rule);
        out.push('\n');

        let labels: Vec<&str> = self.sets.iter().map(|s| s.label()).collect();
        out.push_str(&format_strings(&labels));
        out.push('\n');
        out.push_str(&format_floats(&self.device_times));
        out.push('\n');
        out.push_str(&format_floats(&self.total_times));
        out.push('\n');
        out.push_str(&format_ints(&self.left_sizes));
        out.push('\n');
        out.push_str(&format_ints(&self.lookup_sizes));
        out.push('\n');
        out
    }

    pub fn write(&self, path: &Path, header: &RecordHeader) -> Result<(), RecordError> {
        std::fs::write(path, self.render(header)).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse record file text.
    pub fn parse(text: &str) -> Result<Self, String> {
        let lists = data_lines(text)?;
        if lists.len() != 5 {
            return Err(format!("expected 5 data lists, found {}", lists.len()));
        }
        let sets = lists[0]
            .iter()
            .map(|l| {
                l.as_str()
                    .ok_or_else(|| format!("set label expected, got {:?}", l))?
                    .parse::<TableSetId>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let floats = |idx: usize, what: &str| -> Result<Vec<f64>, String> {
            lists[idx]
                .iter()
                .map(|l| l.as_f64().ok_or_else(|| format!("{what}: number expected, got {:?}", l)))
                .collect()
        };
        let ints = |idx: usize, what: &str| -> Result<Vec<u64>, String> {
            lists[idx]
                .iter()
                .map(|l| l.as_u64().ok_or_else(|| format!("{what}: row count expected, got {:?}", l)))
                .collect()
        };
        let record = Self {
            device_times: floats(1, "device times")?,
            total_times: floats(2, "total times")?,
            left_sizes: ints(3, "left sizes")?,
            lookup_sizes: ints(4, "lookup sizes")?,
            sets,
        };
        let n = record.sets.len();
        if [
            record.device_times.len(),
            record.total_times.len(),
            record.left_sizes.len(),
            record.lookup_sizes.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(format!("lists differ in length from the {n} set labels"));
        }
        Ok(record)
    }

    pub fn read(path: &Path) -> Result<Self, RecordError> {
        let text = std::fs::read_to_string(path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|reason| RecordError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }
}

/// Every non-blank, non-comment line parsed as a literal sequence.
pub fn data_lines(text: &str) -> Result<Vec<Vec<Literal>>, String> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty() && !l.starts_with('#'))
        .map(|(i, l)| parse_sequence(l).map_err(|e| format!("line {}: {}", i + 1, e)))
        .collect()
}

/// Name of the descriptive copy of the record file, or `None` when the run
/// used default parameters.
pub fn archive_name(
    full_catalog: bool,
    fixed_lookup: Option<TableSetId>,
    runs: u32,
) -> Option<String> {
    let mut name = String::new();
    if full_catalog {
        name.push_str("-allsets");
    }
    if let Some(pt) = fixed_lookup {
        name.push('-');
        name.push_str(&pt.lookup_table());
    }
    if runs > 1 {
        name.push_str(&format!("-iter{}", runs));
    }
    if name.is_empty() {
        None
    } else {
        Some(format!("gpujoin{}.tms", name))
    }
}

/// Write the record file to `dir/gpujoin.tms` plus its descriptive copy.
/// Returns the paths written.
pub fn persist(
    record: &RecordFile,
    header: &RecordHeader,
    dir: &Path,
    archive: Option<&str>,
) -> Result<Vec<PathBuf>, RecordError> {
    std::fs::create_dir_all(dir).map_err(|source| RecordError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(crate::config::RECORD_FILE);
    record.write(&path, header)?;
    let mut written = vec![path.clone()];
    if let Some(name) = archive {
        let copy = dir.join(name);
        std::fs::copy(&path, &copy).map_err(|source| RecordError::Io {
            path: copy.clone(),
            source,
        })?;
        written.push(copy);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::resolve;
    use TableSetId::*;

    fn metrics() -> Vec<RunMetrics> {
        vec![
            RunMetrics::new(S208K, 0.012345678, 0.05, 212992, 212992),
            RunMetrics::new(S416K, 0.024, 0.1, 425984, 425984),
        ]
    }

    fn header(runs: u32) -> RecordHeader {
        RecordHeader {
            created: Local::now(),
            runs,
            pairs: vec![resolve(S208K, None), resolve(S416K, None)],
        }
    }

    #[test]
    fn test_from_metrics_rounds_to_four_decimals() {
        let r = RecordFile::from_metrics(&metrics());
        assert_eq!(r.device_times, vec![0.0123, 0.024]);
        assert_eq!(r.left_sizes, vec![212992, 425984]);
    }

    #[test]
    fn test_render_parse_roundtrip() {
        let r = RecordFile::from_metrics(&metrics());
        let text = r.render(&header(2));
        assert!(text.contains("# GPU runs per table set: 2"));
        assert!(text.contains("('lpt208K', 'pt208K'), ('lpt416K', 'pt416K')"));
        assert!(text.contains("['208K', '416K']\n"));
        assert_eq!(RecordFile::parse(&text).unwrap(), r);
    }

    #[test]
    fn test_pairs_wrap_every_three() {
        let r = RecordFile::from_metrics(&[]);
        let mut h = header(1);
        h.pairs = [S208K, S416K, S832K, S2M]
            .iter()
            .map(|&s| resolve(s, Some(S2M)))
            .collect();
        let text = r.render(&h);
        assert!(text.contains("('lpt832K', 'pt2M'),\n#  ('lpt2M', 'pt2M')\n#\n"));
    }

    #[test]
    fn test_parse_rejects_wrong_list_count() {
        assert!(RecordFile::parse("['208K']\n[0.1]\n").is_err());
        assert!(RecordFile::parse("['208K']\n[0.1]\n[0.2]\n[1]\n[1, 2]\n").is_err());
        assert!(RecordFile::parse("['1G']\n[0.1]\n[0.2]\n[1]\n[1]\n").is_err());
    }

    #[test]
    fn test_archive_name() {
        assert_eq!(archive_name(false, None, 1), None);
        assert_eq!(archive_name(true, None, 1).as_deref(), Some("gpujoin-allsets.tms"));
        assert_eq!(
            archive_name(false, Some(S832K), 3).as_deref(),
            Some("gpujoin-pt832K-iter3.tms")
        );
        assert_eq!(
            archive_name(true, Some(S16M), 2).as_deref(),
            Some("gpujoin-allsets-pt16M-iter2.tms")
        );
    }

    #[test]
    fn test_persist_writes_copy() {
        let dir = tempfile::tempdir().unwrap();
        let r = RecordFile::from_metrics(&metrics());
        let paths = persist(&r, &header(2), dir.path(), Some("gpujoin-iter2.tms")).unwrap();
        assert_eq!(paths.len(), 2);
        let a = std::fs::read_to_string(&paths[0]).unwrap();
        let b = std::fs::read_to_string(&paths[1]).unwrap();
        assert_eq!(a, b);
        assert_eq!(RecordFile::read(&paths[1]).unwrap(), r);
    }
}
