//! Table loader: resolves a set's triple to files and materializes the rows.

pub mod cache;
pub mod text;

use std::path::{Path, PathBuf};
use std::time::Duration;

use gpujoin_runtime::{TableRow, WallTimer};
use tracing::info;

use crate::catalog::TableTriple;
use crate::config::SourceFormat;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("file not found: {}", path.display())]
    TableNotFound { path: PathBuf },
    #[error("{}:{line}: {msg}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        msg: String,
    },
    #[error("corrupt cache file {}: {reason}", path.display())]
    CorruptCache { path: PathBuf, reason: String },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl LoadError {
    /// Map an open/read error, turning `NotFound` into [`LoadError::TableNotFound`].
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::TableNotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Rows of one table, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableArray {
    pub name: String,
    pub rows: Vec<TableRow>,
}

impl TableArray {
    pub fn new(name: impl Into<String>, rows: Vec<TableRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Key column.
    pub fn ids(&self) -> Vec<u32> {
        self.rows.iter().map(|r| r.id).collect()
    }

    /// Overwrite the key column with `ids` (one per row).
    pub fn set_ids(&mut self, ids: &[u32]) {
        for (row, &id) in self.rows.iter_mut().zip(ids) {
            row.id = id;
        }
    }

    /// Append null rows until the row count is a non-zero multiple of
    /// `block`. Returns the number of rows added.
    pub fn pad_to_multiple(&mut self, block: usize) -> usize {
        if block == 0 {
            return 0;
        }
        let target = self.rows.len().div_ceil(block).max(1) * block;
        let added = target - self.rows.len();
        self.rows.resize(target, TableRow::NULL);
        added
    }
}

/// The three arrays of one table set.
#[derive(Debug, Clone)]
pub struct LoadedSet {
    pub left: TableArray,
    pub lookup: TableArray,
    pub reference: TableArray,
    pub load_time: Duration,
}

/// File path of table `name` in `dir` for `format`.
pub fn table_path(dir: &Path, name: &str, format: SourceFormat) -> PathBuf {
    let ext = match format {
        SourceFormat::Text => text::TEXT_EXTENSION,
        SourceFormat::BinaryCache => cache::CACHE_EXTENSION,
    };
    dir.join(name).with_extension(ext)
}

/// Load one table, writing its binary cache afterwards when `make_cache` is
/// set and the source is text.
pub fn load_table(
    dir: &Path,
    name: &str,
    format: SourceFormat,
    make_cache: bool,
) -> Result<TableArray, LoadError> {
    let path = table_path(dir, name, format);
    info!("Reading {}", path.display());
    let timer = WallTimer::start();
    let rows = match format {
        SourceFormat::Text => text::load(&path)?,
        SourceFormat::BinaryCache => cache::load(&path)?,
    };
    info!(
        "{} rows loaded ({})",
        rows.len(),
        crate::output::timefmt::human_duration(timer.stop())
    );
    if make_cache && format == SourceFormat::Text {
        let cache_path = table_path(dir, name, SourceFormat::BinaryCache);
        cache::save(&cache_path, &rows)?;
        info!("cache written to {}", cache_path.display());
    }
    Ok(TableArray::new(name, rows))
}

/// Load the left, lookup, and reference tables of `triple`.
pub fn load(
    triple: &TableTriple,
    dir: &Path,
    format: SourceFormat,
    make_cache: bool,
) -> Result<LoadedSet, LoadError> {
    let timer = WallTimer::start();
    let left = load_table(dir, &triple.left, format, make_cache)?;
    let lookup = load_table(dir, &triple.lookup, format, make_cache)?;
    let reference = load_table(dir, &triple.reference, format, make_cache)?;
    Ok(LoadedSet {
        left,
        lookup,
        reference,
        load_time: timer.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{resolve, TableSetId};

    fn write_set(dir: &Path, label: &str) {
        let rows = vec![TableRow::new(0, b"A"), TableRow::new(0, b"B")];
        text::save(&dir.join(format!("lpt{label}.csv")), &rows).unwrap();
        let lookup = vec![TableRow::new(10, b"A"), TableRow::new(20, b"B")];
        text::save(&dir.join(format!("pt{label}.csv")), &lookup).unwrap();
        let reference = vec![TableRow::new(10, b"A"), TableRow::new(20, b"B")];
        text::save(&dir.join(format!("rt{label}.csv")), &reference).unwrap();
    }

    #[test]
    fn test_load_text_set() {
        let dir = tempfile::tempdir().unwrap();
        write_set(dir.path(), "208K");
        let set = load(
            &resolve(TableSetId::S208K, None),
            dir.path(),
            SourceFormat::Text,
            false,
        )
        .unwrap();
        assert_eq!(set.left.name, "lpt208K");
        assert_eq!(set.lookup.ids(), vec![10, 20]);
        assert_eq!(set.reference.len(), 2);
        assert!(!dir.path().join("lpt208K.bin").exists());
    }

    #[test]
    fn test_make_cache_then_load_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_set(dir.path(), "416K");
        let triple = resolve(TableSetId::S416K, None);
        let from_text = load(&triple, dir.path(), SourceFormat::Text, true).unwrap();
        assert!(dir.path().join("pt416K.bin").exists());
        let from_cache = load(&triple, dir.path(), SourceFormat::BinaryCache, false).unwrap();
        assert_eq!(from_text.left, from_cache.left);
        assert_eq!(from_text.lookup, from_cache.lookup);
        assert_eq!(from_text.reference, from_cache.reference);
    }

    #[test]
    fn test_missing_table_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(
            &resolve(TableSetId::S2M, None),
            dir.path(),
            SourceFormat::Text,
            false,
        )
        .unwrap_err();
        match err {
            LoadError::TableNotFound { path } => assert!(path.ends_with("lpt2M.csv")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pad_to_multiple() {
        let mut t = TableArray::new("pt", vec![TableRow::new(1, b"x"); 17]);
        assert_eq!(t.pad_to_multiple(16), 15);
        assert_eq!(t.len(), 32);
        assert_eq!(t.rows[31], TableRow::NULL);

        let mut exact = TableArray::new("pt", vec![TableRow::new(1, b"x"); 16]);
        assert_eq!(exact.pad_to_multiple(16), 0);

        let mut empty = TableArray::new("pt", Vec::new());
        assert_eq!(empty.pad_to_multiple(16), 16);
    }

    #[test]
    fn test_set_ids_overwrites_keys() {
        let mut t = TableArray::new("lpt", vec![TableRow::new(0, b"a"), TableRow::new(0, b"b")]);
        t.set_ids(&[5, 6]);
        assert_eq!(t.ids(), vec![5, 6]);
        assert_eq!(t.rows[1].text_bytes(), b"b");
    }
}
