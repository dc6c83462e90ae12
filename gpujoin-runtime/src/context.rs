//! OpenCL device: platform selection, context, profiling queue, program.
//!
//! `OpenClDevice` is created once per batch. It owns the context, a command
//! queue with profiling enabled, and the built join program; table sets only
//! borrow it through [`ProcessingWindow`](crate::buffer::ProcessingWindow).

use std::ptr;
use std::time::Duration;

use opencl3::command_queue::{CommandQueue, CL_QUEUE_PROFILING_ENABLE};
use opencl3::context::Context;
use opencl3::device::{Device, CL_DEVICE_TYPE_GPU};
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{Buffer, ClMem, CL_MEM_READ_ONLY, CL_MEM_WRITE_ONLY};
use opencl3::platform::get_platforms;
use opencl3::program::Program;
use opencl3::types::{cl_device_id, cl_uint, CL_BLOCKING};
use tracing::{debug, info};

use crate::device::{DeviceInfo, JoinDevice, PlatformSelector};
use crate::error::RuntimeError;
use crate::kernel::KERNEL_NAME;
use crate::timing::profiling_interval;
use crate::types::{LaunchGeometry, TableRow};

/// OpenCL implementation of [`JoinDevice`].
pub struct OpenClDevice {
    info: DeviceInfo,
    _context_devices: Vec<cl_device_id>,
    context: Context,
    queue: CommandQueue,
    program: Program,
    kernel: Kernel,
    block_rows: usize,
}

/// Device buffers for one table set.
pub struct OpenClBuffers {
    left: Buffer<TableRow>,
    lookup: Buffer<TableRow>,
    output: Buffer<u32>,
    lookup_rows: cl_uint,
    geometry: LaunchGeometry,
}

impl OpenClDevice {
    /// Select a platform, build a context over all of its GPUs, and build
    /// `source` (already carrying the `BLKSIZE` for `block_rows`).
    pub fn new(
        selector: &PlatformSelector,
        source: &str,
        block_rows: usize,
    ) -> Result<Self, RuntimeError> {
        let platforms = get_platforms()
            .map_err(|e| RuntimeError::Context(format!("failed to get OpenCL platforms: {}", e)))?;

        let (platform_name, device_ids) = match selector {
            PlatformSelector::Named(name) => {
                let platform = platforms
                    .iter()
                    .find(|p| {
                        p.name()
                            .map(|n| n.eq_ignore_ascii_case(name))
                            .unwrap_or(false)
                    })
                    .ok_or_else(|| RuntimeError::PlatformNotFound(name.clone()))?;
                let ids = platform.get_devices(CL_DEVICE_TYPE_GPU).unwrap_or_default();
                if ids.is_empty() {
                    return Err(RuntimeError::NoDevices(name.clone()));
                }
                (platform.name().unwrap_or_else(|_| name.clone()), ids)
            }
            PlatformSelector::Any => platforms
                .iter()
                .find_map(|p| {
                    let ids = p.get_devices(CL_DEVICE_TYPE_GPU).ok()?;
                    if ids.is_empty() {
                        None
                    } else {
                        Some((p.name().unwrap_or_default(), ids))
                    }
                })
                .ok_or_else(|| RuntimeError::NoDevices("any".into()))?,
        };

        let device_name = Device::new(device_ids[0]).name().unwrap_or_default();
        debug!(
            platform = %platform_name,
            devices = device_ids.len(),
            "creating OpenCL context"
        );

        let context = Context::from_devices(&device_ids, &[], None, ptr::null_mut())
            .map_err(|e| RuntimeError::Context(format!("context: {}", e)))?;

        let queue =
            CommandQueue::create_default_with_properties(&context, CL_QUEUE_PROFILING_ENABLE, 0)
                .map_err(|e| RuntimeError::Context(format!("command queue: {}", e)))?;

        let program = Program::create_and_build_from_source(&context, source, "")
            .map_err(RuntimeError::KernelBuild)?;
        let kernel = Kernel::create(&program, KERNEL_NAME)
            .map_err(|e| RuntimeError::KernelBuild(format!("{}: {}", KERNEL_NAME, e)))?;

        info!("OpenCL program built for {} on {}", device_name, platform_name);

        Ok(Self {
            info: DeviceInfo {
                platform: platform_name,
                device: device_name,
            },
            _context_devices: device_ids,
            context,
            queue,
            program,
            kernel,
            block_rows,
        })
    }

    /// Program binaries, one per context device (PTX on NVIDIA platforms).
    pub fn program_binaries(&self) -> Result<Vec<Vec<u8>>, RuntimeError> {
        self.program
            .get_binaries()
            .map_err(|e| RuntimeError::KernelBuild(format!("program binaries: {}", e)))
    }

    fn upload(&self, rows: &[TableRow], what: &'static str) -> Result<Buffer<TableRow>, RuntimeError> {
        let mut buf = unsafe {
            Buffer::<TableRow>::create(&self.context, CL_MEM_READ_ONLY, rows.len(), ptr::null_mut())
                .map_err(|e| RuntimeError::DeviceAllocation {
                    what,
                    reason: e.to_string(),
                })?
        };
        unsafe {
            self.queue
                .enqueue_write_buffer(&mut buf, CL_BLOCKING, 0, rows, &[])
                .map_err(|e| RuntimeError::Transfer(format!("write {}: {}", what, e)))?;
        }
        Ok(buf)
    }
}

impl JoinDevice for OpenClDevice {
    type Buffers = OpenClBuffers;

    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn acquire(
        &self,
        left: &[TableRow],
        lookup: &[TableRow],
        geometry: &LaunchGeometry,
    ) -> Result<OpenClBuffers, RuntimeError> {
        if geometry.block_rows() != self.block_rows {
            return Err(RuntimeError::Geometry(format!(
                "program built for BLKSIZE {}, launch uses {}",
                self.block_rows,
                geometry.block_rows()
            )));
        }
        let lookup_rows = cl_uint::try_from(lookup.len()).map_err(|_| {
            RuntimeError::Geometry(format!("{} lookup rows exceed u32", lookup.len()))
        })?;

        let left_buf = self.upload(left, "left table")?;
        let lookup_buf = self.upload(lookup, "lookup table")?;
        let output = unsafe {
            Buffer::<u32>::create(&self.context, CL_MEM_WRITE_ONLY, left.len(), ptr::null_mut())
                .map_err(|e| RuntimeError::DeviceAllocation {
                    what: "output ids",
                    reason: e.to_string(),
                })?
        };

        Ok(OpenClBuffers {
            left: left_buf,
            lookup: lookup_buf,
            output,
            lookup_rows,
            geometry: *geometry,
        })
    }

    fn launch(&self, buffers: &OpenClBuffers) -> Result<Duration, RuntimeError> {
        let g = &buffers.geometry;
        let event = unsafe {
            ExecuteKernel::new(&self.kernel)
                .set_arg(&buffers.left.get())
                .set_arg(&buffers.lookup.get())
                .set_arg(&buffers.lookup_rows)
                .set_arg(&buffers.output.get())
                .set_arg_local_buffer(g.scratch_bytes())
                .set_global_work_sizes(&[g.global.0, g.global.1])
                .set_local_work_sizes(&[g.local.0, g.local.1])
                .enqueue_nd_range(&self.queue)
                .map_err(|e| RuntimeError::Enqueue(e.to_string()))?
        };

        event
            .wait()
            .map_err(|e| RuntimeError::Enqueue(format!("kernel wait: {}", e)))?;

        let start = event
            .profiling_command_start()
            .map_err(|e| RuntimeError::Enqueue(format!("profiling start: {}", e)))?;
        let end = event
            .profiling_command_end()
            .map_err(|e| RuntimeError::Enqueue(format!("profiling end: {}", e)))?;
        Ok(profiling_interval(start, end))
    }

    fn read_output(&self, buffers: &OpenClBuffers, ids: &mut [u32]) -> Result<(), RuntimeError> {
        if ids.len() != buffers.geometry.global.0 {
            return Err(RuntimeError::Transfer(format!(
                "output holds {} ids, destination {}",
                buffers.geometry.global.0,
                ids.len()
            )));
        }
        unsafe {
            self.queue
                .enqueue_read_buffer(&buffers.output, CL_BLOCKING, 0, ids, &[])
                .map_err(|e| RuntimeError::Transfer(format!("read output ids: {}", e)))?;
        }
        Ok(())
    }

    fn release(&self, buffers: OpenClBuffers) {
        drop(buffers);
    }
}
