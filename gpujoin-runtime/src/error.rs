use std::path::PathBuf;

/// Error type for device setup, buffer management, and kernel launches.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("OpenCL platform \"{0}\" not found")]
    PlatformNotFound(String),
    #[error("no GPUs found on \"{0}\" platform")]
    NoDevices(String),
    #[error("failed to create compute context: {0}")]
    Context(String),
    #[error("failed to read kernel source {path}: {source}")]
    KernelSource {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("kernel build failed: {0}")]
    KernelBuild(String),
    #[error("device allocation failed for {what}: {reason}")]
    DeviceAllocation { what: &'static str, reason: String },
    #[error("kernel enqueue failed: {0}")]
    Enqueue(String),
    #[error("device transfer failed: {0}")]
    Transfer(String),
    #[error("invalid launch geometry: {0}")]
    Geometry(String),
    #[error("processing window already released")]
    Released,
}
