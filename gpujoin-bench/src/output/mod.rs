//! Output modules: summary table (comfy-table), JSON export, progress
//! spinner, and human-readable durations.

pub mod json;
pub mod progress;
pub mod table;
pub mod timefmt;
