use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    CodePointJob, ConnectionParams, GazetteerJob, ImportJob, DEFAULT_GAZETTEER_ENCODING,
};
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "os-data-import")]
#[command(version, about = "Import Ordnance Survey Code-Point and Gazetteer data into SQLite")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log debug detail, including the SQL issued
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors, no progress bars
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Where the tables go
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Directory holding the database files, or :memory:
    pub server: String,

    /// Database file stem (<server>/<database>.sqlite)
    pub database: String,

    /// Schema to create the tables in (main, or a name to attach)
    pub schema: String,

    /// Name of the new point table
    pub table: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import Code-Point postcode centroids from a directory of CSV files
    #[command(name = "CODEPOINT", alias = "codepoint")]
    CodePoint {
        #[command(flatten)]
        target: Target,

        /// Directory of Code-Point CSV files (or a single CSV file)
        data_directory: PathBuf,

        /// Header-definition file giving the PC/EA/NO column positions
        column_header_file: Option<PathBuf>,
    },

    /// Import the 1:50 000 gazetteer with county and feature lookup tables
    #[command(name = "GAZETTEER", alias = "gazetteer")]
    Gazetteer {
        #[command(flatten)]
        target: Target,

        /// Name of the new county lookup table
        county_lookup_table: String,

        /// Name of the new feature lookup table
        feature_lookup_table: String,

        /// Colon-separated gazetteer data file
        data_file: PathBuf,

        /// Text encoding of the data file (WHATWG label, e.g. utf-8)
        #[arg(long, env = "OS_IMPORT_ENCODING", default_value = DEFAULT_GAZETTEER_ENCODING)]
        encoding: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

impl Command {
    /// Validate the arguments into an immutable job
    pub fn into_job(self) -> Result<ImportJob> {
        match self {
            Command::CodePoint {
                target,
                data_directory,
                column_header_file,
            } => {
                let (connection, table) = target.split();
                ImportJob::codepoint(
                    connection,
                    CodePointJob {
                        table,
                        data_path: data_directory,
                        column_headers: column_header_file,
                    },
                )
            }
            Command::Gazetteer {
                target,
                county_lookup_table,
                feature_lookup_table,
                data_file,
                encoding,
            } => {
                let (connection, table) = target.split();
                ImportJob::gazetteer(
                    connection,
                    GazetteerJob {
                        table,
                        county_table: county_lookup_table,
                        feature_table: feature_lookup_table,
                        data_file,
                        encoding,
                    },
                )
            }
        }
    }
}

impl Target {
    fn split(self) -> (ConnectionParams, String) {
        (
            ConnectionParams::new(self.server, self.database, self.schema),
            self.table,
        )
    }
}
