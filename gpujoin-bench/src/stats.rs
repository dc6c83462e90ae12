use serde::{Deserialize, Serialize};

/// Descriptive statistics over the executed runs of one table set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
    pub cv_percent: f64,
    pub sample_count: usize,
}

/// Compute descriptive statistics from timing samples.
///
/// Run counts are small (at most four), so no outlier rejection is applied.
pub fn compute_stats(samples: &[f64]) -> Stats {
    if samples.is_empty() {
        return Stats {
            mean: 0.0,
            median: 0.0,
            min: 0.0,
            max: 0.0,
            stddev: 0.0,
            cv_percent: 0.0,
            sample_count: 0,
        };
    }

    let mut sorted: Vec<f64> = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let stddev = if n > 1 {
        (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    } else {
        0.0
    };
    let cv_percent = if mean > 0.0 {
        (stddev / mean) * 100.0
    } else {
        0.0
    };

    Stats {
        mean,
        median: median(&sorted),
        min: sorted[0],
        max: sorted[n - 1],
        stddev,
        cv_percent,
        sample_count: n,
    }
}

/// Median of a sorted, non-empty slice.
fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}
