//! Baseline (database join) timings used for the speed-up row.
//!
//! Two layouts are accepted: the five-list record layout, keyed by the set
//! labels on its first line, and a single list of times with one entry per
//! catalog set in catalog order.

use std::collections::BTreeMap;
use std::path::Path;

use super::record::{data_lines, RecordFile};
use super::RecordError;
use crate::catalog::TableSetId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    times: BTreeMap<TableSetId, f64>,
}

impl Baseline {
    pub fn parse(text: &str) -> Result<Self, String> {
        let lists = data_lines(text)?;
        let times = match lists.len() {
            1 => {
                let list = &lists[0];
                if list.len() > TableSetId::ALL.len() {
                    return Err(format!(
                        "{} baseline times for {} catalog sets",
                        list.len(),
                        TableSetId::ALL.len()
                    ));
                }
                TableSetId::ALL
                    .iter()
                    .zip(list)
                    .map(|(&set, lit)| {
                        lit.as_f64()
                            .map(|t| (set, t))
                            .ok_or_else(|| format!("number expected, got {:?}", lit))
                    })
                    .collect::<Result<BTreeMap<_, _>, _>>()?
            }
            5 => {
                let record = RecordFile::parse(text)?;
                record
                    .sets
                    .into_iter()
                    .zip(record.device_times)
                    .collect()
            }
            n => return Err(format!("expected 1 or 5 data lists, found {}", n)),
        };
        Ok(Self { times })
    }

    /// Load `path`; `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, RecordError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RecordError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&text)
            .map(Some)
            .map_err(|reason| RecordError::Parse {
                path: path.to_path_buf(),
                reason,
            })
    }

    pub fn time(&self, set: TableSetId) -> Option<f64> {
        self.times.get(&set).copied()
    }

    /// Baseline time for each of `sets`, matched by identity.
    pub fn for_sets(&self, sets: &[TableSetId]) -> Vec<Option<f64>> {
        sets.iter().map(|&s| self.time(s)).collect()
    }
}

/// `baseline / device`, rounded to two decimals.
pub fn speed_up(baseline: f64, device: f64) -> Option<f64> {
    if device > 0.0 && baseline.is_finite() {
        Some((baseline / device * 100.0).round() / 100.0)
    } else {
        None
    }
}

/// Lookup table encoded in a record file name such as
/// `gpujoin-allsets-pt832K-iter2.tms`.
pub fn lookup_from_file_name(name: &str) -> Option<TableSetId> {
    name.match_indices("pt").find_map(|(at, _)| {
        let rest = &name[at + 2..];
        TableSetId::ALL
            .iter()
            .copied()
            .filter(|s| rest.starts_with(s.label()))
            .max_by_key(|s| s.label().len())
    })
}
