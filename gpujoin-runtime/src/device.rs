//! The seam between the scheduler and an accelerator.
//!
//! A [`JoinDevice`] owns the compute context and queue for the whole batch.
//! Per table set it hands out device buffers through
//! [`ProcessingWindow`](crate::buffer::ProcessingWindow), runs the join kernel
//! over them, and copies the output ids back to the host.

use std::time::Duration;

use crate::error::RuntimeError;
use crate::types::{LaunchGeometry, TableRow};

/// Description of the selected platform/device, for the run banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub platform: String,
    pub device: String,
}

/// Platform to build the compute context on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformSelector {
    /// Platform name, matched case-insensitively.
    Named(String),
    /// First platform that exposes at least one GPU.
    Any,
}

impl Default for PlatformSelector {
    fn default() -> Self {
        PlatformSelector::Named("NVIDIA CUDA".to_string())
    }
}

impl std::str::FromStr for PlatformSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("platform name is empty".to_string());
        }
        if s.eq_ignore_ascii_case("any") {
            Ok(PlatformSelector::Any)
        } else {
            Ok(PlatformSelector::Named(s.to_string()))
        }
    }
}

impl std::fmt::Display for PlatformSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformSelector::Named(name) => write!(f, "{}", name),
            PlatformSelector::Any => write!(f, "any"),
        }
    }
}

/// An accelerator able to run the join kernel contract.
///
/// Implementations block in [`launch`](JoinDevice::launch) until the device
/// finishes; there is never more than one launch in flight.
pub trait JoinDevice {
    /// Device buffers for one processing window: left rows and lookup rows
    /// (read-only), output ids (write-only, one per left row), and the
    /// scratch size for one block of lookup rows plus the match counter.
    type Buffers;

    fn info(&self) -> DeviceInfo;

    /// Allocate and upload the operands of one table set.
    fn acquire(
        &self,
        left: &[TableRow],
        lookup: &[TableRow],
        geometry: &LaunchGeometry,
    ) -> Result<Self::Buffers, RuntimeError>;

    /// Enqueue the kernel and wait for completion. Returns the
    /// device-reported execution time.
    fn launch(&self, buffers: &Self::Buffers) -> Result<Duration, RuntimeError>;

    /// Copy the output id column back into `ids` (one entry per left row).
    fn read_output(&self, buffers: &Self::Buffers, ids: &mut [u32]) -> Result<(), RuntimeError>;

    /// Release the buffers immediately.
    fn release(&self, buffers: Self::Buffers);
}

impl<D: JoinDevice + ?Sized> JoinDevice for &D {
    type Buffers = D::Buffers;

    fn info(&self) -> DeviceInfo {
        (**self).info()
    }

    fn acquire(
        &self,
        left: &[TableRow],
        lookup: &[TableRow],
        geometry: &LaunchGeometry,
    ) -> Result<Self::Buffers, RuntimeError> {
        (**self).acquire(left, lookup, geometry)
    }

    fn launch(&self, buffers: &Self::Buffers) -> Result<Duration, RuntimeError> {
        (**self).launch(buffers)
    }

    fn read_output(&self, buffers: &Self::Buffers, ids: &mut [u32]) -> Result<(), RuntimeError> {
        (**self).read_output(buffers, ids)
    }

    fn release(&self, buffers: Self::Buffers) {
        (**self).release(buffers)
    }
}

/// Check a launch geometry against the left table before allocating.
pub fn validate_geometry(geometry: &LaunchGeometry) -> Result<(), RuntimeError> {
    if geometry.local.0 == 0 || geometry.local.1 == 0 {
        return Err(RuntimeError::Geometry(format!(
            "local size {:?} has a zero dimension",
            geometry.local
        )));
    }
    if geometry.global.0 == 0 {
        return Err(RuntimeError::Geometry("left table is empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_selector_parse() {
        assert_eq!("any".parse::<PlatformSelector>().unwrap(), PlatformSelector::Any);
        assert_eq!("ANY".parse::<PlatformSelector>().unwrap(), PlatformSelector::Any);
        assert_eq!(
            "Intel(R) OpenCL".parse::<PlatformSelector>().unwrap(),
            PlatformSelector::Named("Intel(R) OpenCL".into())
        );
        assert!("  ".parse::<PlatformSelector>().is_err());
        assert_eq!(PlatformSelector::default().to_string(), "NVIDIA CUDA");
    }

    #[test]
    fn test_validate_geometry() {
        assert!(validate_geometry(&LaunchGeometry::new(32, (16, 1))).is_ok());
        assert!(validate_geometry(&LaunchGeometry::new(32, (0, 1))).is_err());
        assert!(validate_geometry(&LaunchGeometry::new(0, (16, 1))).is_err());
    }
}
