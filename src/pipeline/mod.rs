//! The import pipeline: provision -> parse -> load -> aggregate -> finalize.
//!
//! Each stage runs to completion before the next starts. Any error aborts the
//! run at the stage that raised it; nothing is retried or rolled back across
//! stages.

pub mod aggregate;
pub mod codepoint;
pub mod finalize;
pub mod gazetteer;
pub mod load;
pub mod provision;

use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::{ConnectionParams, Dataset, DatasetKind, ImportJob};
use crate::error::{ImportError, Result};
use crate::geo::{CoordinateTransformer, Osgb36ToWgs84};
use crate::schema::TableSchema;
use crate::staging::StagedDataset;
use crate::ui::{Phase, Ui};
use crate::writer::sqlite::SqliteStore;

pub use aggregate::{aggregate_districts_and_sectors, DerivedRows};
pub use codepoint::CodePointImporter;
pub use gazetteer::GazetteerImporter;

/// Records parsed between progress updates while staging
const STAGE_PROGRESS_INTERVAL: usize = 10_000;

/// One dataset's pipeline. Provision, load and finalize are shared; an
/// importer supplies its tables, its parse pass and any derived rows.
pub trait Importer {
    fn kind(&self) -> DatasetKind;

    /// Every table the import creates, primary table first
    fn tables(&self) -> Vec<TableSchema>;

    /// Parse and transform all source records into memory
    fn stage(&self, ui: &mut impl Ui) -> Result<StagedDataset>;

    /// Rows computed from the loaded data
    fn derive(&self, _store: &mut SqliteStore, _schema: &str, _ui: &mut impl Ui) -> Result<DerivedRows> {
        Ok(DerivedRows::default())
    }

    fn provision(&self, store: &mut SqliteStore, schema: &str) -> Result<()> {
        provision::provision(store, schema, &self.tables())
    }

    /// Load every staged table, in staging order
    fn load(
        &self,
        store: &mut SqliteStore,
        schema: &str,
        staged: &StagedDataset,
        ui: &mut impl Ui,
    ) -> Result<Vec<(String, u64)>> {
        let mut counts = Vec::with_capacity(staged.tables.len());
        for table in &staged.tables {
            let count = load::load(store, table, schema, &table.table, ui)?;
            counts.push((table.table.clone(), count));
        }
        Ok(counts)
    }

    fn finalize(&self, store: &mut SqliteStore, schema: &str, ui: &mut impl Ui) -> Result<()> {
        let tables = self.tables();
        let (primary, lookups) = tables
            .split_first()
            .ok_or_else(|| ImportError::config("Importer defines no tables"))?;
        finalize::finalize(store, schema, primary, lookups, ui)
    }
}

/// Row counts of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub kind: DatasetKind,
    /// Rows bulk loaded per table, primary table first
    pub loaded: Vec<(String, u64)>,
    pub derived: DerivedRows,
    pub elapsed: Duration,
}

impl ImportSummary {
    pub fn rows_in(&self, table: &str) -> Option<u64> {
        self.loaded
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, count)| *count)
    }

    pub fn total_rows(&self) -> u64 {
        self.loaded.iter().map(|(_, count)| count).sum::<u64>() + self.derived.total()
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} import complete in {:.1}s:", self.kind, self.elapsed.as_secs_f64())?;
        for (table, count) in &self.loaded {
            write!(f, " {} {} rows;", table, count)?;
        }
        if self.derived.total() > 0 {
            write!(
                f,
                " {} district and {} sector rows added;",
                self.derived.districts, self.derived.sectors
            )?;
        }
        write!(f, " {} rows in total", self.total_rows())
    }
}

/// Run an import job with the OSGB36 -> WGS84 converter
pub fn run_import(job: &ImportJob, ui: &mut impl Ui) -> Result<ImportSummary> {
    run_import_with(job, &Osgb36ToWgs84, ui)
}

/// Run an import job with a caller-supplied coordinate converter
pub fn run_import_with<C>(job: &ImportJob, converter: &C, ui: &mut impl Ui) -> Result<ImportSummary>
where
    C: CoordinateTransformer + ?Sized,
{
    match &job.dataset {
        Dataset::CodePoint(codepoint) => {
            let importer = CodePointImporter::new(codepoint, converter)?;
            run_pipeline(&job.connection, &importer, ui)
        }
        Dataset::Gazetteer(gazetteer) => {
            let importer = GazetteerImporter::new(gazetteer)?;
            run_pipeline(&job.connection, &importer, ui)
        }
    }
}

/// Drive one importer through every stage. The connection lives for the
/// whole run and is closed when this returns, on success or failure.
pub fn run_pipeline<I: Importer>(
    connection: &ConnectionParams,
    importer: &I,
    ui: &mut impl Ui,
) -> Result<ImportSummary> {
    let start = Instant::now();
    let schema = connection.schema.as_str();
    let mut store = SqliteStore::open(connection)?;

    ui.set_phase(Phase::Provisioning);
    importer.provision(&mut store, schema)?;

    ui.set_phase(Phase::Parsing);
    let staged = importer.stage(ui)?;

    ui.set_phase(Phase::Loading);
    info!("Loading {} staged row(s) into schema {}", staged.total_rows(), schema);
    let loaded = importer.load(&mut store, schema, &staged, ui)?;
    drop(staged);

    let derived = importer.derive(&mut store, schema, ui)?;

    ui.set_phase(Phase::Finalizing);
    importer.finalize(&mut store, schema, ui)?;

    ui.set_phase(Phase::Complete);
    let summary = ImportSummary {
        kind: importer.kind(),
        loaded,
        derived,
        elapsed: start.elapsed(),
    };
    info!("{}", summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CodePointJob, IN_MEMORY};
    use crate::ui::RecordingUi;
    use std::fs;
    use tempfile::TempDir;

    fn codepoint_job(dir: &TempDir) -> ImportJob {
        ImportJob::codepoint(
            ConnectionParams::new(IN_MEMORY, "os", "main"),
            CodePointJob {
                table: "postcodes".into(),
                data_path: dir.path().to_path_buf(),
                column_headers: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_phases_run_in_order() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("ab.csv"),
            "\"AB1 2CD\",10,\"S\",\"S\",\"S\",\"S\",\"S\",\"S\",\"S\",\"S\",394251,806376\n",
        )
        .unwrap();

        let mut ui = RecordingUi::default();
        let summary =
            run_import_with(&codepoint_job(&dir), &|_e: f64, _n: f64| (-2.0, 57.0), &mut ui).unwrap();

        assert_eq!(
            ui.phases,
            vec![
                Phase::Provisioning,
                Phase::Parsing,
                Phase::Loading,
                Phase::Aggregating,
                Phase::Finalizing,
                Phase::Complete,
            ]
        );
        assert_eq!(summary.rows_in("postcodes"), Some(1));
        assert_eq!(summary.derived, DerivedRows { districts: 1, sectors: 1 });
        assert_eq!(summary.total_rows(), 3);
    }

    #[test]
    fn test_malformed_record_stops_before_loading() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ab.csv"), "\"AB1 2CD\",10\n").unwrap();

        let mut ui = RecordingUi::default();
        let err = run_import_with(&codepoint_job(&dir), &|_e: f64, _n: f64| (0.0, 0.0), &mut ui)
            .unwrap_err();

        assert!(matches!(err, ImportError::MalformedRecord { line: 1, .. }));
        assert_eq!(ui.phases, vec![Phase::Provisioning, Phase::Parsing]);
    }

    #[test]
    fn test_summary_display() {
        let summary = ImportSummary {
            kind: DatasetKind::Gazetteer,
            loaded: vec![("places".into(), 3), ("counties".into(), 2)],
            derived: DerivedRows::default(),
            elapsed: Duration::from_millis(1500),
        };
        let text = summary.to_string();
        assert!(text.starts_with("GAZETTEER import complete in 1.5s"));
        assert!(text.contains("places 3 rows"));
        assert!(text.ends_with("5 rows in total"));
    }
}
