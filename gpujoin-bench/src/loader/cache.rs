// Binary table cache: 64-byte header followed by packed 64-byte rows.
//
// Written next to a text table by `--make-cache` and read back by
// `--use-cache`. Row order is the text file's row order.

use std::io::Write;
use std::path::Path;

use gpujoin_runtime::{TableRow, ROW_SIZE};

use super::LoadError;

/// Header size, one row wide so rows start row-aligned.
pub const HEADER_SIZE: usize = ROW_SIZE;

/// Magic bytes: "GJTB" in little-endian.
pub const CACHE_MAGIC: u32 = 0x4254_4A47;

pub const CACHE_VERSION: u32 = 1;

/// File extension of cache files.
pub const CACHE_EXTENSION: &str = "bin";

const CHECKSUM_OFFSET: usize = 20;

/// Cache file header.
///
/// Layout (little-endian):
///   [0..4)    magic        "GJTB"
///   [4..8)    version      1
///   [8..16)   row_count
///   [16..20)  rows_crc     CRC32 over the packed rows
///   [20..24)  checksum     CRC32 over bytes [0..20)
///   [24..64)  reserved, zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeader {
    pub row_count: u64,
    pub rows_crc: u32,
}

impl CacheHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&CACHE_MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&CACHE_VERSION.to_le_bytes());
        buf[8..16].copy_from_slice(&self.row_count.to_le_bytes());
        buf[16..20].copy_from_slice(&self.rows_crc.to_le_bytes());
        let crc = crc32fast::hash(&buf[..CHECKSUM_OFFSET]);
        buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Parse and validate magic, version, and header checksum.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, String> {
        if buf.len() < HEADER_SIZE {
            return Err(format!(
                "header too small: {} bytes, expected {}",
                buf.len(),
                HEADER_SIZE
            ));
        }
        let magic = read_u32(buf, 0);
        if magic != CACHE_MAGIC {
            return Err(format!(
                "bad magic: 0x{:08X}, expected 0x{:08X}",
                magic, CACHE_MAGIC
            ));
        }
        let version = read_u32(buf, 4);
        if version != CACHE_VERSION {
            return Err(format!(
                "unsupported version: {}, expected {}",
                version, CACHE_VERSION
            ));
        }
        let expected = crc32fast::hash(&buf[..CHECKSUM_OFFSET]);
        let stored = read_u32(buf, CHECKSUM_OFFSET);
        if stored != expected {
            return Err(format!(
                "checksum mismatch: stored 0x{:08X}, computed 0x{:08X}",
                stored, expected
            ));
        }
        let mut count = [0u8; 8];
        count.copy_from_slice(&buf[8..16]);
        Ok(Self {
            row_count: u64::from_le_bytes(count),
            rows_crc: read_u32(buf, 16),
        })
    }
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(b)
}

/// Write `rows` to `path` atomically (temp file, fsync, rename).
pub fn save(path: &Path, rows: &[TableRow]) -> Result<(), LoadError> {
    let mut payload = Vec::with_capacity(rows.len() * ROW_SIZE);
    for row in rows {
        payload.extend_from_slice(&row.to_bytes());
    }
    let header = CacheHeader {
        row_count: rows.len() as u64,
        rows_crc: crc32fast::hash(&payload),
    };

    let tmp_path = path.with_extension("bin.tmp");
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::create(&tmp_path).map_err(io_err)?;
    file.write_all(&header.to_bytes()).map_err(io_err)?;
    file.write_all(&payload).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);
    std::fs::rename(&tmp_path, path).map_err(io_err)?;
    Ok(())
}

/// Read a cache file written by [`save`].
pub fn load(path: &Path) -> Result<Vec<TableRow>, LoadError> {
    let data = std::fs::read(path).map_err(|source| LoadError::from_io(path, source))?;
    let corrupt = |reason: String| LoadError::CorruptCache {
        path: path.to_path_buf(),
        reason,
    };

    let header = CacheHeader::from_bytes(&data).map_err(corrupt)?;
    let body = &data[HEADER_SIZE..];
    let expected_len = usize::try_from(header.row_count)
        .ok()
        .and_then(|n| n.checked_mul(ROW_SIZE))
        .ok_or_else(|| corrupt(format!("row count {} out of range", header.row_count)))?;
    if body.len() != expected_len {
        return Err(corrupt(format!(
            "{} rows declared, {} bytes of row data",
            header.row_count,
            body.len()
        )));
    }
    let crc = crc32fast::hash(body);
    if crc != header.rows_crc {
        return Err(corrupt(format!(
            "row checksum mismatch: stored 0x{:08X}, computed 0x{:08X}",
            header.rows_crc, crc
        )));
    }

    body.chunks_exact(ROW_SIZE)
        .map(|chunk| {
            TableRow::from_bytes(chunk).ok_or_else(|| corrupt("short row".to_string()))
        })
        .collect()
}
