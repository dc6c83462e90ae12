//! Summary table using comfy-table.
//!
//! One column per table set; rows for left/lookup sizes, device and total
//! time, and, when baseline data exists, the baseline time and speed-up.
//! Rendered from a [`RecordFile`] so the live summary and one reprinted
//! from a saved record are identical.

use comfy_table::{presets, Cell, CellAlignment, Table};

use crate::results::baseline::{speed_up, Baseline};
use crate::results::record::RecordFile;

fn right(s: impl ToString) -> Cell {
    Cell::new(s.to_string()).set_alignment(CellAlignment::Right)
}

fn row<T>(label: &str, values: impl IntoIterator<Item = T>, fmt: impl Fn(T) -> String) -> Vec<Cell> {
    std::iter::once(Cell::new(label))
        .chain(values.into_iter().map(|v| right(fmt(v))))
        .collect()
}

/// Render the summary as text.
pub fn render_summary(record: &RecordFile, baseline: Option<&Baseline>) -> String {
    let mut table = Table::new();
    table.load_preset(presets::ASCII_FULL);

    let mut header = vec![Cell::new("")];
    header.extend(record.sets.iter().map(|s| right(s.label())));
    table.set_header(header);

    table.add_row(row("linkpage table size", &record.left_sizes, |v| v.to_string()));
    table.add_row(row("page table size", &record.lookup_sizes, |v| v.to_string()));
    table.add_row(row("device time", &record.device_times, |v| format!("{:?}", v)));
    table.add_row(row("total time", &record.total_times, |v| format!("{:?}", v)));

    if let Some(baseline) = baseline {
        let times = baseline.for_sets(&record.sets);
        table.add_row(row("baseline time", &times, |v| match v {
            Some(t) => format!("{:?}", t),
            None => "-".to_string(),
        }));
        let factors = times.iter().zip(&record.device_times).map(|(b, &d)| {
            b.and_then(|b| speed_up(b, d))
        });
        table.add_row(row("GPU speed-up", factors, |v| match v {
            Some(f) => format!("{:?}x", f),
            None => "-".to_string(),
        }));
    }

    format!("Output Summary. All times in sec.\n{table}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableSetId::*;

    fn record() -> RecordFile {
        RecordFile {
            sets: vec![S208K, S416K],
            device_times: vec![0.1, 0.2],
            total_times: vec![0.15, 0.25],
            left_sizes: vec![212992, 425984],
            lookup_sizes: vec![212992, 425984],
        }
    }

    #[test]
    fn test_summary_rows() {
        let text = render_summary(&record(), None);
        assert!(text.contains("linkpage table size"));
        assert!(text.contains("212992"));
        assert!(text.contains("0.25"));
        assert!(!text.contains("speed-up"));
    }

    #[test]
    fn test_summary_with_baseline() {
        let baseline = Baseline::parse("[1.0]\n").unwrap();
        let text = render_summary(&record(), Some(&baseline));
        assert!(text.contains("GPU speed-up"));
        assert!(text.contains("10.0x"));
        // 416K has no baseline entry
        assert!(text.contains(" - "));
    }

    #[test]
    fn test_summary_is_deterministic() {
        assert_eq!(render_summary(&record(), None), render_summary(&record(), None));
    }
}
