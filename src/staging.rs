//! In-memory staging of typed rows ahead of the bulk load.
//!
//! A [`StagedDataset`] is built completely by the parse phase and handed to
//! the loader read-only; nothing is streamed to the database while parsing.

/// A single value ready for binding to an INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            SqlValue::Real(f) => stmt.raw_bind_parameter(idx, f)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Real(f)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

/// A typed row that knows its destination column names
pub trait StageRow {
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<SqlValue>;
}

/// Rows destined for one table, with a fixed column set
#[derive(Debug, Clone, PartialEq)]
pub struct StagedTable {
    pub table: String,
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<SqlValue>>,
}

impl StagedTable {
    pub fn new(table: impl Into<String>, columns: &'static [&'static str]) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows<'a, R, I>(table: impl Into<String>, rows: I) -> Self
    where
        R: StageRow + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        let mut staged = Self::new(table, R::COLUMNS);
        for row in rows {
            staged.push(row);
        }
        staged
    }

    pub fn push<R: StageRow>(&mut self, row: &R) {
        debug_assert_eq!(R::COLUMNS, self.columns);
        self.rows.push(row.values());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Every table of one import, in load order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedDataset {
    pub tables: Vec<StagedTable>,
}

impl StagedDataset {
    pub fn new(tables: Vec<StagedTable>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&StagedTable> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.len()).sum()
    }
}
