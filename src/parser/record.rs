use encoding_rs::Encoding;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ImportError, Result};

/// How many fields every record of a source must split into
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldCount {
    Exactly(usize),
    AtLeast(usize),
}

impl FieldCount {
    fn accepts(&self, found: usize) -> bool {
        match *self {
            FieldCount::Exactly(n) => found == n,
            FieldCount::AtLeast(n) => found >= n,
        }
    }
}

impl fmt::Display for FieldCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldCount::Exactly(n) => write!(f, "{} fields", n),
            FieldCount::AtLeast(n) => write!(f, "at least {} fields", n),
        }
    }
}

/// Delimiter, quoting and encoding of a delimited source file
#[derive(Debug, Clone)]
pub struct SourceFormat {
    pub delimiter: u8,
    pub quoted: bool,
    pub fields: FieldCount,
    pub encoding: &'static Encoding,
}

impl SourceFormat {
    /// Comma-separated, double-quoted text fields, UTF-8
    pub fn csv(fields: FieldCount) -> Self {
        Self {
            delimiter: b',',
            quoted: true,
            fields,
            encoding: encoding_rs::UTF_8,
        }
    }

    /// Colon-separated, no quoting (place names may contain quote characters)
    pub fn colon_separated(fields: FieldCount, encoding: &'static Encoding) -> Self {
        Self {
            delimiter: b':',
            quoted: false,
            fields,
            encoding,
        }
    }
}

/// Look up a WHATWG encoding label such as `utf-8` or `windows-1252`
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ImportError::config(format!("Unknown text encoding: {}", label)))
}

/// One non-empty line of a source file, split into its fields
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub file: Arc<Path>,
    pub line: u64,
    pub fields: Vec<String>,
}

impl RawRecord {
    pub fn malformed(&self, reason: impl Into<String>) -> ImportError {
        ImportError::malformed(self.file.as_ref(), self.line, reason)
    }

    pub fn field(&self, idx: usize) -> Result<&str> {
        self.fields
            .get(idx)
            .map(|s| s.as_str())
            .ok_or_else(|| self.malformed(format!("missing field {}", idx)))
    }

    pub fn parse_i64(&self, idx: usize, name: &str) -> Result<i64> {
        let raw = self.field(idx)?;
        raw.trim()
            .parse::<i64>()
            .map_err(|_| self.malformed(format!("invalid {} value: '{}'", name, raw)))
    }

    pub fn parse_f64(&self, idx: usize, name: &str) -> Result<f64> {
        let raw = self.field(idx)?;
        raw.trim()
            .parse::<f64>()
            .map_err(|_| self.malformed(format!("invalid {} value: '{}'", name, raw)))
    }
}

/// Collect the data files for an import: a single file, or every file with
/// the given extension in a directory, in path order
pub fn discover_files(path: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(ImportError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| ImportError::io(path, e))? {
        let entry = entry.map_err(|e| ImportError::io(path, e))?;
        let file = entry.path();
        let matches = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && file.is_file() {
            files.push(file);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(ImportError::config(format!(
            "No *.{} data files found in {}",
            extension,
            path.display()
        )));
    }

    Ok(files)
}

type Records = csv::StringRecordsIntoIter<Cursor<Arc<[u8]>>>;

/// One decoded file being read, with a running line count.
///
/// csv positions do not count the blank lines skipped before a record, so
/// lines are counted here from the decoded text.
struct OpenFile {
    path: Arc<Path>,
    text: Arc<[u8]>,
    records: Records,
    scanned: usize,
    line: u64,
}

impl OpenFile {
    /// 1-based line of the record starting at or after `byte`
    fn line_at(&mut self, byte: u64) -> u64 {
        let from = (byte as usize).clamp(self.scanned, self.text.len());
        let start = self.text[from..]
            .iter()
            .position(|b| !matches!(b, b'\n' | b'\r'))
            .map_or(self.text.len(), |offset| from + offset);
        self.line += self.text[self.scanned..start]
            .iter()
            .filter(|&&b| b == b'\n')
            .count() as u64;
        self.scanned = start;
        self.line
    }
}

/// Lazy sequence of raw records over a list of files, read one file at a time.
///
/// Re-creating the reader over the same files yields the same records.
pub struct RecordReader {
    pending: std::vec::IntoIter<PathBuf>,
    format: SourceFormat,
    current: Option<OpenFile>,
}

impl RecordReader {
    pub fn new(files: Vec<PathBuf>, format: SourceFormat) -> Self {
        Self {
            pending: files.into_iter(),
            format,
            current: None,
        }
    }

    fn open(&self, path: &Path) -> Result<OpenFile> {
        debug!("Reading {}", path.display());
        let bytes = fs::read(path).map_err(|e| ImportError::io(path, e))?;
        let text: Arc<[u8]> = Arc::from(decode(path, &bytes, self.format.encoding)?);

        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.format.delimiter)
            .quoting(self.format.quoted)
            .from_reader(Cursor::new(Arc::clone(&text)));

        Ok(OpenFile {
            path: Arc::from(path),
            text,
            records: reader.into_records(),
            scanned: 0,
            line: 1,
        })
    }

    fn check(&self, path: Arc<Path>, line: u64, record: csv::StringRecord) -> Result<RawRecord> {
        if !self.format.fields.accepts(record.len()) {
            return Err(ImportError::malformed(
                path.as_ref(),
                line,
                format!("expected {}, found {}", self.format.fields, record.len()),
            ));
        }

        Ok(RawRecord {
            file: path,
            line,
            fields: record.iter().map(str::to_string).collect(),
        })
    }
}

impl Iterator for RecordReader {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let path = self.pending.next()?;
                match self.open(&path) {
                    Ok(file) => self.current = Some(file),
                    Err(e) => {
                        self.pending = Vec::new().into_iter();
                        return Some(Err(e));
                    }
                }
            }

            let file = self.current.as_mut()?;
            let path = Arc::clone(&file.path);

            match file.records.next() {
                None => self.current = None,
                Some(Err(e)) => {
                    let line = file.line_at(e.position().map_or(0, |p| p.byte()));
                    self.pending = Vec::new().into_iter();
                    self.current = None;
                    return Some(Err(ImportError::malformed(path.as_ref(), line, e.to_string())));
                }
                Some(Ok(record)) if is_blank(&record) => continue,
                Some(Ok(record)) => {
                    let line = file.line_at(record.position().map_or(0, |p| p.byte()));
                    return Some(self.check(path, line, record));
                }
            }
        }
    }
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty()) && record.len() <= 1
}

fn decode(path: &Path, bytes: &[u8], encoding: &'static Encoding) -> Result<Vec<u8>> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        let line = text
            .find('\u{FFFD}')
            .map(|pos| text[..pos].matches('\n').count() as u64 + 1)
            .unwrap_or(0);
        return Err(ImportError::malformed(
            path,
            line,
            format!("invalid {} byte sequence", encoding.name()),
        ));
    }
    Ok(text.into_owned().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_reads_quoted_fields_and_line_numbers() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "ab.csv", b"\"AB1 2CD\",10,100000,200000\n\n\"AB1 3EF\",10,100100,200100\n");

        let records: Vec<_> = RecordReader::new(vec![path], SourceFormat::csv(FieldCount::Exactly(4)))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields[0], "AB1 2CD");
        assert_eq!(records[0].line, 1);
        assert_eq!(records[1].line, 3);
        assert_eq!(records[1].parse_i64(3, "northing").unwrap(), 200100);
    }

    #[test]
    fn test_short_line_names_file_and_line() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "bad.csv", b"\"AB1 2CD\",10,100000,200000\n\"AB1 3EF\",10\n");

        let err = RecordReader::new(vec![path], SourceFormat::csv(FieldCount::AtLeast(4)))
            .collect::<Result<Vec<_>>>()
            .unwrap_err();

        match err {
            ImportError::MalformedRecord { file, line, .. } => {
                assert!(file.ends_with("bad.csv"));
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_line_after_blank_lines_reports_its_own_line() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "gaps.csv",
            b"\"AB1 2CD\",10,100000,200000\n\n\r\n\n\"AB1 3EF\",10,1\n\n\"AB1 4GH\",10\n",
        );

        let mut reader = RecordReader::new(vec![path], SourceFormat::csv(FieldCount::Exactly(4)));
        assert_eq!(reader.next().unwrap().unwrap().line, 1);

        match reader.next().unwrap().unwrap_err() {
            ImportError::MalformedRecord { line, reason, .. } => {
                assert_eq!(line, 5);
                assert_eq!(reason, "expected 4 fields, found 3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_line_numbers_survive_blank_lines_between_files() {
        let dir = TempDir::new().unwrap();
        let first = write(dir.path(), "a.txt", b"\n\n1:a\n\n2:b\n");
        let second = write(dir.path(), "b.txt", b"\r\n3:c\r\n\r\n\r\n4:d\r\n");

        let lines: Vec<u64> = RecordReader::new(
            vec![first, second],
            SourceFormat::colon_separated(FieldCount::Exactly(2), encoding_rs::UTF_8),
        )
        .map(|r| r.unwrap().line)
        .collect();
        assert_eq!(lines, vec![3, 5, 2, 5]);
    }

    #[test]
    fn test_undecodable_bytes_after_blank_lines_report_their_line() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "g.csv", b"ok,1\n\n\nbad\xFF,2\n");
        let err = RecordReader::new(vec![path], SourceFormat::csv(FieldCount::Exactly(2)))
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ImportError::MalformedRecord { line: 4, .. }));
    }

    #[test]
    fn test_bad_number_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "n.csv", b"x,abc\n");
        let record = RecordReader::new(vec![path], SourceFormat::csv(FieldCount::Exactly(2)))
            .next()
            .unwrap()
            .unwrap();
        assert!(matches!(
            record.parse_i64(1, "easting"),
            Err(ImportError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_colon_separated_keeps_quotes() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "g.txt", b"1:x:St \"Mary's\":y\n");
        let record = RecordReader::new(
            vec![path],
            SourceFormat::colon_separated(FieldCount::AtLeast(4), encoding_rs::UTF_8),
        )
        .next()
        .unwrap()
        .unwrap();
        assert_eq!(record.fields[2], "St \"Mary's\"");
    }

    #[test]
    fn test_decodes_windows_1252() {
        let dir = TempDir::new().unwrap();
        // 0xE2 is a-circumflex in windows-1252
        let path = write(dir.path(), "g.txt", b"1:Br\xE2n\n");
        let encoding = resolve_encoding("windows-1252").unwrap();
        let record = RecordReader::new(
            vec![path],
            SourceFormat::colon_separated(FieldCount::Exactly(2), encoding),
        )
        .next()
        .unwrap()
        .unwrap();
        assert_eq!(record.fields[1], "Br\u{e2}n");
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "g.csv", b"ok,1\nbad\xFF,2\n");
        let err = RecordReader::new(vec![path], SourceFormat::csv(FieldCount::Exactly(2)))
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ImportError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn test_discover_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.CSV", b"");
        write(dir.path(), "a.csv", b"");
        write(dir.path(), "notes.txt", b"");

        let files = discover_files(dir.path(), "csv").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.CSV"]);
    }

    #[test]
    fn test_discover_missing_path() {
        let err = discover_files(Path::new("/definitely/not/here"), "csv").unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound { .. }));
    }

    #[test]
    fn test_unknown_encoding() {
        assert!(matches!(
            resolve_encoding("klingon"),
            Err(ImportError::Configuration(_))
        ));
    }

    #[test]
    fn test_reparse_is_identical() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "ab.csv", b"\"AB1 2CD\",1\n\"AB1 3EF\",2\n");
        let format = SourceFormat::csv(FieldCount::Exactly(2));

        let first: Vec<_> = RecordReader::new(vec![path.clone()], format.clone())
            .collect::<Result<_>>()
            .unwrap();
        let second: Vec<_> = RecordReader::new(vec![path], format)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(first, second);
    }
}
