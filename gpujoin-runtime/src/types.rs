//! Host-side row layout and launch geometry shared with the join kernel.
//!
//! All three tables of a set (left, lookup, reference) use the same 64-byte
//! record: a `u32` key followed by a fixed 60-byte text field. The kernel reads
//! rows as `ROWLEN` consecutive `uint4` vectors, so the layout here must stay
//! `#[repr(C)]` and exactly `ROW_SIZE` bytes.

use std::fmt;

/// Length of the fixed text field, in bytes.
pub const TEXT_LEN: usize = 60;

/// Size of one record in bytes.
pub const ROW_SIZE: usize = 64;

/// Row stride in `uint4` vectors (the kernel's `ROWLEN` constant).
pub const ROW_VECS: usize = ROW_SIZE / 16;

/// Default work-group shape, one block of lookup rows per group.
pub const DEFAULT_LOCAL_SIZE: (usize, usize) = (16, 1);

/// One table record: numeric key plus NUL-padded text.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableRow {
    pub id: u32,
    pub text: [u8; TEXT_LEN],
}

const _: () = assert!(std::mem::size_of::<TableRow>() == ROW_SIZE);

impl TableRow {
    /// Null row used for padding: id 0, empty text.
    pub const NULL: TableRow = TableRow {
        id: 0,
        text: [0u8; TEXT_LEN],
    };

    /// Build a row, truncating `text` to `TEXT_LEN` bytes.
    pub fn new(id: u32, text: &[u8]) -> Self {
        let mut row = Self::NULL;
        row.id = id;
        let n = text.len().min(TEXT_LEN);
        row.text[..n].copy_from_slice(&text[..n]);
        row
    }

    /// Text bytes up to the first NUL.
    pub fn text_bytes(&self) -> &[u8] {
        let end = self
            .text
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(TEXT_LEN);
        &self.text[..end]
    }

    /// Lossy UTF-8 view of the text, for diagnostics.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(self.text_bytes()).into_owned()
    }

    /// Serialize to the on-disk / on-device byte layout (little-endian key).
    pub fn to_bytes(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        buf[..4].copy_from_slice(&self.id.to_le_bytes());
        buf[4..].copy_from_slice(&self.text);
        buf
    }

    /// Inverse of [`TableRow::to_bytes`]. `buf` must hold at least `ROW_SIZE` bytes.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < ROW_SIZE {
            return None;
        }
        let id = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let mut text = [0u8; TEXT_LEN];
        text.copy_from_slice(&buf[4..ROW_SIZE]);
        Some(Self { id, text })
    }
}

impl fmt::Debug for TableRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableRow")
            .field("id", &self.id)
            .field("text", &self.text_lossy())
            .finish()
    }
}

/// Global/local work sizes for one kernel launch.
///
/// Global size is `(left_rows, 1)`; the local size product is the kernel's
/// `BLKSIZE`, i.e. how many lookup rows are staged in scratch memory at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchGeometry {
    pub global: (usize, usize),
    pub local: (usize, usize),
}

impl LaunchGeometry {
    pub fn new(left_rows: usize, local: (usize, usize)) -> Self {
        Self {
            global: (left_rows, 1),
            local,
        }
    }

    /// Lookup rows per block (`BLKSIZE`).
    pub fn block_rows(&self) -> usize {
        self.local.0 * self.local.1
    }

    /// Scratch bytes: one block of lookup rows plus one `u32` match counter.
    pub fn scratch_bytes(&self) -> usize {
        self.block_rows() * ROW_SIZE + std::mem::size_of::<u32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_layout_is_64_bytes() {
        assert_eq!(std::mem::size_of::<TableRow>(), 64);
        assert_eq!(std::mem::align_of::<TableRow>(), 4);
        assert_eq!(ROW_VECS, 4);
    }

    #[test]
    fn test_new_truncates_long_text() {
        let long = vec![b'x'; 100];
        let row = TableRow::new(7, &long);
        assert_eq!(row.id, 7);
        assert_eq!(row.text_bytes().len(), TEXT_LEN);
    }

    #[test]
    fn test_text_bytes_stops_at_nul() {
        let row = TableRow::new(1, b"Main_Page");
        assert_eq!(row.text_bytes(), b"Main_Page");
        assert_eq!(row.text_lossy(), "Main_Page");
    }

    #[test]
    fn test_bytes_layout() {
        let row = TableRow::new(0x0102_0304, b"ab");
        let bytes = row.to_bytes();
        assert_eq!(&bytes[..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..6], b"ab");
        assert_eq!(TableRow::from_bytes(&bytes), Some(row));
        assert_eq!(TableRow::from_bytes(&bytes[..10]), None);
    }

    #[test]
    fn test_geometry_scratch() {
        let g = LaunchGeometry::new(1000, DEFAULT_LOCAL_SIZE);
        assert_eq!(g.global, (1000, 1));
        assert_eq!(g.block_rows(), 16);
        assert_eq!(g.scratch_bytes(), 16 * 64 + 4);
    }
}
