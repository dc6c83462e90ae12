// Text table format: one row per line, `<key>\t'<text>'`.
//
// The text field is single-quoted and may contain backslash escapes
// (`\\`, `\'`, `\t`, `\n`, `\xHH`). Text longer than the row's text field
// is truncated. Blank lines are skipped.

use std::io::{BufRead, Write};
use std::path::Path;

use gpujoin_runtime::{TableRow, TEXT_LEN};

use super::LoadError;

/// File extension of text tables.
pub const TEXT_EXTENSION: &str = "csv";

/// Parse one line into a row. The text field is taken as raw bytes.
pub fn parse_line(line: impl AsRef<[u8]>) -> Result<TableRow, String> {
    let line = line.as_ref();
    let end = line
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |p| p + 1);
    let line = &line[..end];
    let sep = line
        .iter()
        .position(|&b| b == b'\t' || b == b' ')
        .ok_or_else(|| "expected <key><TAB><text>".to_string())?;
    let (key, rest) = (&line[..sep], &line[sep + 1..]);
    let key = String::from_utf8_lossy(key);
    let id: u32 = key
        .trim()
        .parse()
        .map_err(|e| format!("bad key '{}': {}", key, e))?;
    let text = unescape(strip_quotes(rest.trim_ascii()))?;
    Ok(TableRow::new(id, &text))
}

fn strip_quotes(s: &[u8]) -> &[u8] {
    for q in [b'\'', b'"'] {
        if s.len() >= 2 && s[0] == q && s[s.len() - 1] == q {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn unescape(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(bytes.len().min(TEXT_LEN * 2));
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }
        let esc = *bytes
            .get(i + 1)
            .ok_or_else(|| "dangling backslash".to_string())?;
        match esc {
            b'\\' | b'\'' | b'"' => out.push(esc),
            b't' => out.push(b'\t'),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b'0' => out.push(0),
            b'x' => {
                let hex = bytes
                    .get(i + 2..i + 4)
                    .ok_or_else(|| "truncated \\x escape".to_string())?;
                let hex = String::from_utf8_lossy(hex);
                let v = u8::from_str_radix(&hex, 16)
                    .map_err(|_| format!("bad \\x escape '{}'", hex))?;
                out.push(v);
                i += 4;
                continue;
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
        i += 2;
    }
    Ok(out)
}

/// Parse every row from `reader`. `path` is only used in error messages.
pub fn parse_rows<R: BufRead>(mut reader: R, path: &Path) -> Result<Vec<TableRow>, LoadError> {
    let mut rows = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if n == 0 {
            break;
        }
        line_no += 1;
        if buf.trim_ascii().is_empty() {
            continue;
        }
        let row = parse_line(&buf).map_err(|msg| LoadError::Malformed {
            path: path.to_path_buf(),
            line: line_no,
            msg,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read a text table from disk.
pub fn load(path: &Path) -> Result<Vec<TableRow>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::from_io(path, source))?;
    parse_rows(std::io::BufReader::new(file), path)
}

/// Format one row the way [`parse_line`] reads it.
pub fn format_row(row: &TableRow) -> String {
    let mut s = format!("{}\t'", row.id);
    for &b in row.text_bytes() {
        match b {
            b'\\' => s.push_str("\\\\"),
            b'\'' => s.push_str("\\'"),
            b'\t' => s.push_str("\\t"),
            b'\n' => s.push_str("\\n"),
            b'\r' => s.push_str("\\r"),
            0x20..=0x7E => s.push(b as char),
            _ => s.push_str(&format!("\\x{:02x}", b)),
        }
    }
    s.push('\'');
    s
}

/// Write rows as a text table.
pub fn save(path: &Path, rows: &[TableRow]) -> Result<(), LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::create(path).map_err(io_err)?;
    let mut w = std::io::BufWriter::new(file);
    for row in rows {
        writeln!(w, "{}", format_row(row)).map_err(io_err)?;
    }
    w.flush().map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_title() {
        let row = parse_line("12\t'Anarchism'").unwrap();
        assert_eq!(row.id, 12);
        assert_eq!(row.text_bytes(), b"Anarchism");
    }

    #[test]
    fn test_parse_null_row() {
        let row = parse_line("0\t''").unwrap();
        assert_eq!(row, TableRow::NULL);
    }

    #[test]
    fn test_parse_escapes() {
        let row = parse_line("7\t'O\\'Brien_\\x41\\\\'").unwrap();
        assert_eq!(row.text_bytes(), b"O'Brien_A\\");
    }

    #[test]
    fn test_parse_truncates_long_text() {
        let long = "x".repeat(80);
        let row = parse_line(&format!("1\t'{}'", long)).unwrap();
        assert_eq!(row.text_bytes().len(), TEXT_LEN);
    }

    #[test]
    fn test_parse_rejects_bad_key() {
        assert!(parse_line("abc\t'x'").is_err());
        assert!(parse_line("no-separator").is_err());
        assert!(parse_line("1\t'bad\\x4'").is_err());
    }

    #[test]
    fn test_parse_rows_reports_line_number() {
        let data = "1\t'a'\n\n2\t'b'\nbad\n";
        let err = parse_rows(data.as_bytes(), Path::new("lpt208K.csv")).unwrap_err();
        match err {
            LoadError::Malformed { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_format_parse_roundtrip() {
        let rows = [
            TableRow::new(3, b"Tab\there"),
            TableRow::new(4, b"Quote'd\\"),
            TableRow::new(5, &[0xC3, 0xA9]),
        ];
        for row in rows {
            assert_eq!(parse_line(&format_row(&row)).unwrap(), row);
        }
    }

    #[test]
    fn test_parse_rows_accepts_latin1_bytes() {
        let data: &[u8] = b"1\t'Caf\xe9'\r\n2\t'\xff\xfe'\n";
        let rows = parse_rows(data, Path::new("pt208K.csv")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text_bytes(), b"Caf\xe9");
        assert_eq!(rows[1].text_bytes(), &[0xFF, 0xFE]);
    }

    #[test]
    fn test_save_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pt208K.csv");
        let rows = vec![TableRow::new(1, b"A"), TableRow::new(2, b"B")];
        save(&path, &rows).unwrap();
        assert_eq!(load(&path).unwrap(), rows);
    }
}
