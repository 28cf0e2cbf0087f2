pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod parser;
pub mod pipeline;
pub mod schema;
pub mod staging;
pub mod transform;
pub mod ui;
pub mod writer;

pub use cli::{Cli, Command};
pub use config::{ConnectionParams, DatasetKind, ImportJob};
pub use error::{ImportError, Result};
pub use geo::{CoordinateTransformer, Osgb36ToWgs84};
pub use pipeline::{run_import, run_import_with, ImportSummary};
pub use ui::{ConsoleUi, Phase, SilentUi, Ui};
