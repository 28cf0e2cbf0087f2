//! The immutable description of one import run

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ImportError, Result};

/// Server value selecting an in-memory database
pub const IN_MEMORY: &str = ":memory:";

pub const DEFAULT_GAZETTEER_ENCODING: &str = "windows-1252";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatasetKind {
    CodePoint,
    Gazetteer,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::CodePoint => write!(f, "CODEPOINT"),
            DatasetKind::Gazetteer => write!(f, "GAZETTEER"),
        }
    }
}

/// Where the target tables live.
///
/// `server` is the directory holding the database files (or `:memory:`),
/// `database` the file stem, `schema` the SQLite schema the tables go into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionParams {
    pub server: String,
    pub database: String,
    pub schema: String,
}

impl ConnectionParams {
    pub fn new(
        server: impl Into<String>,
        database: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            database: database.into(),
            schema: schema.into(),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.server == IN_MEMORY
    }

    /// Database file for the `main` schema
    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.server).join(format!("{}.sqlite", self.database))
    }

    /// Database file attached for any schema other than `main`
    pub fn schema_path(&self) -> PathBuf {
        Path::new(&self.server).join(format!("{}.{}.sqlite", self.database, self.schema))
    }

    /// True when the schema is the main database rather than an attached one
    pub fn is_main_schema(&self) -> bool {
        self.schema.eq_ignore_ascii_case("main")
    }

    fn validate(&self) -> Result<()> {
        require("ServerName", &self.server)?;
        require("DatabaseName", &self.database)?;
        require("SchemaName", &self.schema)?;
        if self.schema.eq_ignore_ascii_case("temp") {
            return Err(ImportError::config("SchemaName cannot be the temp schema"));
        }
        if !self.is_in_memory() && !Path::new(&self.server).is_dir() {
            return Err(ImportError::config(format!(
                "Server directory does not exist: {}",
                self.server
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodePointJob {
    pub table: String,
    /// Directory of CSV files, or a single CSV file
    pub data_path: PathBuf,
    pub column_headers: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GazetteerJob {
    pub table: String,
    pub county_table: String,
    pub feature_table: String,
    pub data_file: PathBuf,
    /// WHATWG label of the data file's text encoding
    pub encoding: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Dataset {
    CodePoint(CodePointJob),
    Gazetteer(GazetteerJob),
}

/// One invocation's unit of work. Validated on construction, never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportJob {
    pub connection: ConnectionParams,
    pub dataset: Dataset,
}

impl ImportJob {
    pub fn codepoint(connection: ConnectionParams, job: CodePointJob) -> Result<Self> {
        connection.validate()?;
        require("TableName", &job.table)?;
        require_path("DataFileDirectory", &job.data_path)?;
        if !job.data_path.exists() {
            return Err(ImportError::FileNotFound {
                path: job.data_path,
            });
        }
        if let Some(headers) = &job.column_headers {
            require_path("ColumnHeadersCsvFile", headers)?;
        }

        Ok(Self {
            connection,
            dataset: Dataset::CodePoint(job),
        })
    }

    pub fn gazetteer(connection: ConnectionParams, job: GazetteerJob) -> Result<Self> {
        connection.validate()?;
        require("TableName", &job.table)?;
        require("CountyLookupTableName", &job.county_table)?;
        require("FeatureLookupTableName", &job.feature_table)?;
        require_path("DataFile", &job.data_file)?;
        require("Encoding", &job.encoding)?;

        let names = [&job.table, &job.county_table, &job.feature_table];
        for (i, a) in names.iter().enumerate() {
            if names[i + 1..].iter().any(|b| a.eq_ignore_ascii_case(b)) {
                return Err(ImportError::config(format!(
                    "Table name {} is used for more than one table",
                    a
                )));
            }
        }

        if !job.data_file.is_file() {
            return Err(ImportError::FileNotFound {
                path: job.data_file,
            });
        }

        Ok(Self {
            connection,
            dataset: Dataset::Gazetteer(job),
        })
    }

    pub fn kind(&self) -> DatasetKind {
        match self.dataset {
            Dataset::CodePoint(_) => DatasetKind::CodePoint,
            Dataset::Gazetteer(_) => DatasetKind::Gazetteer,
        }
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ImportError::config(format!("{} must be supplied", name)));
    }
    Ok(())
}

fn require_path(name: &str, value: &Path) -> Result<()> {
    require(name, &value.to_string_lossy())
}
