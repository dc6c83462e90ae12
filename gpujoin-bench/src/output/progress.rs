//! Per-set progress spinner using indicatif.
//!
//! Shown on stderr when the console is not in verbose mode; hidden
//! otherwise so it does not interleave with log lines.

use indicatif::{ProgressBar, ProgressStyle};

pub struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    /// Spinner over `total` table sets.
    pub fn new(total: usize, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        if visible {
            bar.enable_steady_tick(std::time::Duration::from_millis(100));
        }
        Self { bar }
    }

    pub fn update(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    /// Mark one set as finished.
    pub fn advance(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
