//! Host reference device.
//!
//! Executes the join kernel contract on the CPU: for every left row, the id
//! of the first lookup row (in table order) with identical text, or 0 when
//! nothing matches. Used with `--no-gpu`, when the crate is built without
//! the `opencl` feature, and by the test suites.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::device::{DeviceInfo, JoinDevice};
use crate::error::RuntimeError;
use crate::types::{LaunchGeometry, TableRow, TEXT_LEN};

/// CPU implementation of the join kernel contract.
#[derive(Debug, Default)]
pub struct HostDevice;

impl HostDevice {
    pub fn new() -> Self {
        Self
    }
}

/// Host copies of the operands plus the output id column.
pub struct HostBuffers {
    left: Vec<TableRow>,
    lookup: Vec<TableRow>,
    output: RefCell<Vec<u32>>,
}

/// Resolve every left row against `lookup`.
pub fn host_join(left: &[TableRow], lookup: &[TableRow], out: &mut [u32]) {
    let mut index: HashMap<&[u8; TEXT_LEN], u32> = HashMap::with_capacity(lookup.len());
    for row in lookup {
        index.entry(&row.text).or_insert(row.id);
    }
    for (slot, row) in out.iter_mut().zip(left) {
        *slot = index.get(&row.text).copied().unwrap_or(0);
    }
}

impl JoinDevice for HostDevice {
    type Buffers = HostBuffers;

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            platform: "host".to_string(),
            device: "CPU reference join".to_string(),
        }
    }

    fn acquire(
        &self,
        left: &[TableRow],
        lookup: &[TableRow],
        geometry: &LaunchGeometry,
    ) -> Result<HostBuffers, RuntimeError> {
        if geometry.global.0 != left.len() {
            return Err(RuntimeError::Geometry(format!(
                "global size {} does not match {} left rows",
                geometry.global.0,
                left.len()
            )));
        }
        Ok(HostBuffers {
            left: left.to_vec(),
            lookup: lookup.to_vec(),
            output: RefCell::new(vec![0u32; left.len()]),
        })
    }

    fn launch(&self, buffers: &HostBuffers) -> Result<Duration, RuntimeError> {
        let start = Instant::now();
        let mut out = buffers.output.borrow_mut();
        host_join(&buffers.left, &buffers.lookup, &mut out);
        Ok(start.elapsed())
    }

    fn read_output(&self, buffers: &HostBuffers, ids: &mut [u32]) -> Result<(), RuntimeError> {
        let out = buffers.output.borrow();
        if ids.len() != out.len() {
            return Err(RuntimeError::Transfer(format!(
                "output holds {} ids, destination {}",
                out.len(),
                ids.len()
            )));
        }
        ids.copy_from_slice(&out);
        Ok(())
    }

    fn release(&self, buffers: HostBuffers) {
        drop(buffers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ProcessingWindow;

    #[test]
    fn test_host_join_resolves_titles() {
        let lookup = vec![
            TableRow::new(10, b"Alpha"),
            TableRow::new(20, b"Beta"),
            TableRow::new(30, b"Gamma"),
        ];
        let left = vec![
            TableRow::new(1, b"Gamma"),
            TableRow::new(2, b"Alpha"),
            TableRow::new(3, b"Missing"),
        ];
        let mut out = vec![0u32; 3];
        host_join(&left, &lookup, &mut out);
        assert_eq!(out, vec![30, 10, 0]);
    }

    #[test]
    fn test_first_lookup_row_wins() {
        let lookup = vec![TableRow::new(5, b"Dup"), TableRow::new(6, b"Dup")];
        let left = vec![TableRow::new(0, b"Dup")];
        let mut out = vec![0u32; 1];
        host_join(&left, &lookup, &mut out);
        assert_eq!(out, vec![5]);
    }

    #[test]
    fn test_window_roundtrip_on_host() {
        let dev = HostDevice::new();
        let lookup = vec![TableRow::new(42, b"Answer")];
        let left = vec![TableRow::new(0, b"Answer"), TableRow::new(0, b"Other")];
        let window = ProcessingWindow::open(&dev, &left, &lookup, (16, 1)).unwrap();
        window.launch().unwrap();
        let mut ids = vec![0u32; 2];
        window.read_output(&mut ids).unwrap();
        assert_eq!(ids, vec![42, 0]);
    }

    #[test]
    fn test_read_output_length_mismatch() {
        let dev = HostDevice::new();
        let left = vec![TableRow::new(0, b"a")];
        let window = ProcessingWindow::open(&dev, &left, &left, (16, 1)).unwrap();
        let mut ids = vec![0u32; 3];
        assert!(matches!(
            window.read_output(&mut ids),
            Err(RuntimeError::Transfer(_))
        ));
    }
}
