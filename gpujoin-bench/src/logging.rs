//! Log setup: an append-only run log plus console output on stderr.
//!
//! The run log always records INFO and above. The console shows INFO with
//! `--verbose` and WARN otherwise; `RUST_LOG` overrides the console level.
//! Summary tables go to the run log only, since they are printed to stdout.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::batch::SUMMARY_TARGET;
use crate::error::BenchError;

/// Open `path` for appending. A new file gets a creation stamp; every
/// invocation writes a separator line.
pub fn open_run_log(path: &Path) -> Result<File, BenchError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| BenchError::io(parent, e))?;
        }
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| BenchError::io(path, e))?;
    let is_new = file.metadata().map_err(|e| BenchError::io(path, e))?.len() == 0;
    let stamp = chrono::Local::now().format("%a %b %e %H:%M:%S %Y");
    let mut header = String::new();
    if is_new {
        header.push_str(&format!("** Created: {} **\n", stamp));
    }
    header.push('\n');
    header.push_str(&"*".repeat(79));
    header.push('\n');
    file.write_all(header.as_bytes())
        .map_err(|e| BenchError::io(path, e))?;
    Ok(file)
}

/// Install the global subscriber.
pub fn init(log_path: &Path, verbose: bool) -> Result<(), BenchError> {
    let file = open_run_log(log_path)?;

    let file_layer = fmt::layer()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(LevelFilter::INFO);

    let console_level = if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    let summary_off = format!("{}=off", SUMMARY_TARGET)
        .parse::<Directive>()
        .map_err(|e| BenchError::Logging(e.to_string()))?;
    let console_filter = EnvFilter::builder()
        .with_default_directive(console_level.into())
        .from_env_lossy()
        .add_directive(summary_off);
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| BenchError::Logging(e.to_string()))
}
