pub mod buffer;
#[cfg(feature = "opencl")]
pub mod context;
pub mod device;
pub mod error;
pub mod host;
pub mod kernel;
pub mod timing;
pub mod types;

pub use buffer::ProcessingWindow;
#[cfg(feature = "opencl")]
pub use context::OpenClDevice;
pub use device::{DeviceInfo, JoinDevice, PlatformSelector};
pub use error::RuntimeError;
pub use host::HostDevice;
pub use kernel::{KernelSource, KERNEL_NAME};
pub use timing::WallTimer;
pub use types::{LaunchGeometry, TableRow, DEFAULT_LOCAL_SIZE, ROW_SIZE, TEXT_LEN};
