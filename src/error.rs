use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Malformed record in {} at line {line}: {reason}", file.display())]
    MalformedRecord {
        file: PathBuf,
        line: u64,
        reason: String,
    },

    #[error(
        "Cannot create new table(s) in schema {schema} because they already exist: {}",
        tables.join(", ")
    )]
    TableAlreadyExists { schema: String, tables: Vec<String> },

    #[error("Column {column} of staged data has no match in table {table}")]
    SchemaMismatch { table: String, column: String },

    #[error("Database error while {context}: {source}")]
    DatabaseOperation {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    pub fn config(message: impl Into<String>) -> Self {
        ImportError::Configuration(message.into())
    }

    pub fn malformed(file: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        ImportError::MalformedRecord {
            file: file.into(),
            line,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ImportError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Attach a description of the failed database operation to a rusqlite error
pub trait DbContext<T> {
    fn db_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> DbContext<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| ImportError::DatabaseOperation {
            context: f().into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_exists_message_lists_every_table() {
        let err = ImportError::TableAlreadyExists {
            schema: "main".into(),
            tables: vec!["places".into(), "counties".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("places, counties"));
        assert!(msg.contains("main"));
    }

    #[test]
    fn test_malformed_names_file_and_line() {
        let err = ImportError::malformed("data/ab.csv", 7, "expected 12 fields, found 3");
        let msg = err.to_string();
        assert!(msg.contains("data/ab.csv"));
        assert!(msg.contains("line 7"));
    }

    #[test]
    fn test_db_context_wraps_source() {
        let res: std::result::Result<(), rusqlite::Error> =
            Err(rusqlite::Error::InvalidQuery);
        let err = res.db_context(|| "creating table main.points").unwrap_err();
        assert!(matches!(err, ImportError::DatabaseOperation { .. }));
        assert!(err.to_string().contains("creating table main.points"));
    }
}
