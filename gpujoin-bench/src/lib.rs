//! gpujoin benchmark harness: joins a left table against a lookup table on
//! an accelerator, verifies the output against a reference table, and
//! records timings for comparison with a database baseline.

pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod output;
pub mod results;
pub mod scheduler;
pub mod stats;
pub mod verify;

pub use batch::{finish, report, run_batch, BatchOutcome, BatchRun};
pub use catalog::{TableSetId, TableTriple};
pub use config::{BatchConfig, Command, ReportConfig};
pub use error::BenchError;
