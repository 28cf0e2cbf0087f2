use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::record::FieldCount;
use crate::error::{ImportError, Result};

pub const POSTCODE_CODE: &str = "PC";
pub const EASTING_CODE: &str = "EA";
pub const NORTHING_CODE: &str = "NO";

/// Column positions used when no header-definition file is supplied
const DEFAULT_POSTCODE_INDEX: usize = 0;
const DEFAULT_EASTING_INDEX: usize = 10;
const DEFAULT_NORTHING_INDEX: usize = 11;

/// Short column code -> zero-based position, read from a header-definition file
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHeaders {
    indices: HashMap<String, usize>,
    width: usize,
}

impl ColumnHeaders {
    /// Read the first line of a header-definition file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ImportError::config(format!(
                "Cannot read column header file {}: {}",
                path.display(),
                e
            ))
        })?;
        let first_line = contents
            .lines()
            .next()
            .unwrap_or("")
            .trim_start_matches('\u{feff}');
        Self::parse(first_line)
            .map_err(|e| ImportError::config(format!("{} ({})", e, path.display())))
    }

    /// Parse a comma-delimited list of column codes
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(line.as_bytes());

        let record = match reader.records().next() {
            Some(Ok(record)) => record,
            Some(Err(e)) => return Err(format!("Invalid column header line: {}", e)),
            None => return Err("Column header file is empty".to_string()),
        };

        let mut indices = HashMap::new();
        for (index, code) in record.iter().enumerate() {
            let code = code.trim();
            if code.is_empty() {
                continue;
            }
            if indices.insert(code.to_string(), index).is_some() {
                return Err(format!("Duplicate column code in header file: {}", code));
            }
        }

        Ok(Self {
            indices,
            width: record.len(),
        })
    }

    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.indices.get(code).copied()
    }

    /// Number of columns the header line declares
    pub fn width(&self) -> usize {
        self.width
    }

    fn require(&self, code: &str, description: &str) -> Result<usize> {
        self.index_of(code).ok_or_else(|| {
            ImportError::config(format!(
                "Could not find {} column ({}) in column header file",
                description, code
            ))
        })
    }
}

/// Where the fields of interest sit in each Code-Point record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodePointLayout {
    pub postcode: usize,
    pub easting: usize,
    pub northing: usize,
    pub fields: FieldCount,
}

impl Default for CodePointLayout {
    fn default() -> Self {
        Self {
            postcode: DEFAULT_POSTCODE_INDEX,
            easting: DEFAULT_EASTING_INDEX,
            northing: DEFAULT_NORTHING_INDEX,
            fields: FieldCount::AtLeast(DEFAULT_NORTHING_INDEX + 1),
        }
    }
}

impl CodePointLayout {
    pub fn from_headers(headers: &ColumnHeaders) -> Result<Self> {
        Ok(Self {
            postcode: headers.require(POSTCODE_CODE, "PostCode")?,
            easting: headers.require(EASTING_CODE, "Easting")?,
            northing: headers.require(NORTHING_CODE, "Northing")?,
            fields: FieldCount::Exactly(headers.width()),
        })
    }

    /// Use the header-definition file when given, the fixed default positions otherwise
    pub fn resolve(header_file: Option<&Path>) -> Result<Self> {
        let layout = match header_file {
            Some(path) => Self::from_headers(&ColumnHeaders::from_file(path)?)?,
            None => Self::default(),
        };
        debug!(
            "Code-Point layout: postcode={} easting={} northing={} ({})",
            layout.postcode, layout.easting, layout.northing, layout.fields
        );
        Ok(layout)
    }
}
