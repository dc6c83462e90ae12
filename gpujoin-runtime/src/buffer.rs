//! Scoped device buffers for one table set.
//!
//! [`ProcessingWindow`] acquires the set's buffers on creation and releases
//! them when dropped, so every exit path (success, mismatch, launch error)
//! gives the memory back before the next set opens its window.

use std::time::Duration;

use tracing::debug;

use crate::device::{validate_geometry, JoinDevice};
use crate::error::RuntimeError;
use crate::types::{LaunchGeometry, TableRow};

/// Device buffers owned by the table set currently being processed.
pub struct ProcessingWindow<'d, D: JoinDevice> {
    device: &'d D,
    buffers: Option<D::Buffers>,
}

impl<'d, D: JoinDevice> ProcessingWindow<'d, D> {
    /// Allocate and upload `left` and `lookup`.
    pub fn open(
        device: &'d D,
        left: &[TableRow],
        lookup: &[TableRow],
        local: (usize, usize),
    ) -> Result<Self, RuntimeError> {
        let geometry = LaunchGeometry::new(left.len(), local);
        validate_geometry(&geometry)?;
        let buffers = device.acquire(left, lookup, &geometry)?;
        debug!(
            left_rows = left.len(),
            lookup_rows = lookup.len(),
            scratch_bytes = geometry.scratch_bytes(),
            "device buffers acquired"
        );
        Ok(Self {
            device,
            buffers: Some(buffers),
        })
    }

    /// Run the kernel once and block until it completes.
    pub fn launch(&self) -> Result<Duration, RuntimeError> {
        let buffers = self.buffers.as_ref().ok_or(RuntimeError::Released)?;
        self.device.launch(buffers)
    }

    /// Read the output ids into `ids`.
    pub fn read_output(&self, ids: &mut [u32]) -> Result<(), RuntimeError> {
        let buffers = self.buffers.as_ref().ok_or(RuntimeError::Released)?;
        self.device.read_output(buffers, ids)
    }

    /// Release now instead of at end of scope.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            self.device.release(buffers);
            debug!("device buffers released");
        }
    }
}

impl<D: JoinDevice> Drop for ProcessingWindow<'_, D> {
    fn drop(&mut self) {
        self.release();
    }
}
