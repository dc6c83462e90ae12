//! Join kernel source handling.
//!
//! The kernel is an external OpenCL program. The engine only prepends the
//! build constants it depends on (`ROWLEN`, `BLKSIZE`, kernel selector) as an
//! auto-generated header. Anything above the kernel banner comment in the
//! source file is treated as a stale generated header and replaced.

use std::path::Path;

use crate::error::RuntimeError;
use crate::types::{LaunchGeometry, ROW_VECS};

/// Entry point the scheduler enqueues.
pub const KERNEL_NAME: &str = "join_vecdata_lmem";

/// Kernel shipped with the crate.
pub const BUILTIN_SOURCE: &str = include_str!("../kernels/join.cl");

/// Start of the kernel banner: a 78-star rule followed by ` * __kernel`.
fn banner() -> String {
    format!("/{}\n * __kernel", "*".repeat(78))
}

/// Kernel source text before constants are applied.
#[derive(Debug, Clone)]
pub struct KernelSource {
    text: String,
}

impl KernelSource {
    /// The built-in `join.cl`.
    pub fn builtin() -> Self {
        Self {
            text: BUILTIN_SOURCE.to_string(),
        }
    }

    /// Read a kernel source file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let text = std::fs::read_to_string(path).map_err(|source| RuntimeError::KernelSource {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { text })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Produce the build-ready source for the given geometry.
    pub fn generate(&self, geometry: &LaunchGeometry) -> String {
        let banner = banner();
        let code = match self.text.find(&banner) {
            Some(pos) => &self.text[pos..],
            None => self.text.as_str(),
        };

        let rule = "*".repeat(78);
        let mut out = String::with_capacity(code.len() + 512);
        out.push_str(&format!("/{rule}\n* Auto-generated kernel source\n{rule}/\n\n"));
        out.push_str(&format!("#define ROWLEN\t{}U\n", ROW_VECS));
        out.push_str(&format!("#define BLKSIZE\t{}U\n", geometry.block_rows()));
        out.push('\n');
        out.push_str("#define NAIVE\t1\n");
        out.push_str("#define XOR\t\t2\n");
        out.push_str("#define OCLFNS\t3\n");
        out.push_str("#define LMEM\t4\n");
        out.push_str("#define LPTSEGS\t\t5\n");
        out.push('\n');
        out.push_str("#define KERNEL\tLMEM\n");
        out.push('\n');
        out.push_str("#ifndef KERNEL\n#define KERNEL\tLMEM\n#endif\n");
        out.push('\n');
        out.push_str(code);
        out
    }
}
