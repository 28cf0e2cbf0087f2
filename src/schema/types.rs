/// Column data type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnType {
    Integer,
    Real,
    /// Variable-length text with an upper bound on length
    Varchar(u16),
    /// Fixed-length code text
    Char(u16),
    /// WKT point text (SRID 4326)
    Point,
}

impl ColumnType {
    pub fn sql_type(&self) -> String {
        match self {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Real => "REAL".to_string(),
            ColumnType::Varchar(n) => format!("VARCHAR({})", n),
            ColumnType::Char(n) => format!("CHAR({})", n),
            ColumnType::Point => "TEXT".to_string(),
        }
    }
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub nullable: bool,
}

impl Column {
    /// Create an optional (nullable) column
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: true,
        }
    }

    /// Create a required (non-nullable) column
    pub const fn required(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: false,
        }
    }
}

/// Foreign key from a column of this table to the key column of a lookup table
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: String,
    pub references_column: &'static str,
}

impl ForeignKey {
    pub fn new(column: &'static str, references_table: impl Into<String>) -> Self {
        Self {
            column,
            references_table: references_table.into(),
            references_column: "code",
        }
    }
}

/// Table definition. The name is chosen per run; columns and keys are fixed per dataset.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub columns: &'static [Column],
    pub primary_key: &'static [&'static str],
    pub foreign_keys: Vec<ForeignKey>,
    /// Column receiving the point built from longitude/latitude
    pub geo_column: Option<&'static str>,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }
}
