//! Top-level error type for a batch run.
//!
//! | Error      | Raised by                          | Effect                        |
//! |------------|------------------------------------|-------------------------------|
//! | Config     | option validation                  | exit before any device work   |
//! | Load       | table loader (missing/bad file)    | batch aborted, no record file |
//! | Device     | buffers, kernel launch, read-back  | batch aborted, no record file |
//! | Runtime    | platform/context/program setup     | exit before the first set     |
//! | Record     | record/baseline file parsing       | report mode fails             |
//! | Io         | log, error log, record persistence | values still printed          |
//!
//! Verification mismatches are not errors; they are collected as
//! [`ErrorReport`](crate::verify::ErrorReport)s.

use std::path::PathBuf;

use gpujoin_runtime::RuntimeError;

use crate::catalog::TableSetId;
use crate::config::ConfigError;
use crate::loader::LoadError;
use crate::results::RecordError;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("table set {set}: {source}")]
    Load { set: TableSetId, source: LoadError },
    #[error("table set {set}: {source}")]
    Device { set: TableSetId, source: RuntimeError },
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl BenchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BenchError::Io {
            path: path.into(),
            source,
        }
    }
}
