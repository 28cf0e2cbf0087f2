use std::path::PathBuf;
use tracing::info;

use super::aggregate::{aggregate_districts_and_sectors, DerivedRows};
use super::{Importer, STAGE_PROGRESS_INTERVAL};
use crate::config::{CodePointJob, DatasetKind};
use crate::error::Result;
use crate::geo::CoordinateTransformer;
use crate::parser::{discover_files, CodePointLayout, RecordReader, SourceFormat};
use crate::schema::{postcode_points, TableSchema};
use crate::staging::{StageRow, StagedDataset, StagedTable};
use crate::transform::PostcodePoint;
use crate::ui::{Phase, Ui};
use crate::writer::sqlite::SqliteStore;

const DATA_EXTENSION: &str = "csv";

/// Imports Code-Point postcode centroids from a directory of CSV files
pub struct CodePointImporter<'a, C: ?Sized> {
    table: String,
    files: Vec<PathBuf>,
    layout: CodePointLayout,
    converter: &'a C,
}

impl<'a, C> CodePointImporter<'a, C>
where
    C: CoordinateTransformer + ?Sized,
{
    /// Resolve the column layout and the data files up front, so a bad header
    /// file or an empty directory fails before any table is created
    pub fn new(job: &CodePointJob, converter: &'a C) -> Result<Self> {
        let layout = CodePointLayout::resolve(job.column_headers.as_deref())?;
        let files = discover_files(&job.data_path, DATA_EXTENSION)?;
        info!("Found {} Code-Point data file(s)", files.len());

        Ok(Self {
            table: job.table.clone(),
            files,
            layout,
            converter,
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn records(&self) -> RecordReader {
        RecordReader::new(self.files.clone(), SourceFormat::csv(self.layout.fields))
    }
}

impl<C> Importer for CodePointImporter<'_, C>
where
    C: CoordinateTransformer + ?Sized,
{
    fn kind(&self) -> DatasetKind {
        DatasetKind::CodePoint
    }

    fn tables(&self) -> Vec<TableSchema> {
        vec![postcode_points(&self.table)]
    }

    fn stage(&self, ui: &mut impl Ui) -> Result<StagedDataset> {
        let mut points = StagedTable::new(self.table.as_str(), PostcodePoint::COLUMNS);

        for record in self.records() {
            let record = record?;
            let point = PostcodePoint::from_record(&record, &self.layout, self.converter)?;
            points.push(&point);
            if points.len() % STAGE_PROGRESS_INTERVAL == 0 {
                ui.set_progress(points.len() as u64, 0, "Code-Point records");
            }
        }
        ui.clear_progress();

        info!("Staged {} postcode points from {} file(s)", points.len(), self.files.len());
        ui.log(format!("Read {} postcodes", points.len()));
        Ok(StagedDataset::new(vec![points]))
    }

    fn derive(&self, store: &mut SqliteStore, schema: &str, ui: &mut impl Ui) -> Result<DerivedRows> {
        ui.set_phase(Phase::Aggregating);
        let derived = aggregate_districts_and_sectors(store, schema, &self.table)?;
        ui.log(format!(
            "{}.{}: {} district and {} sector rows added",
            schema, self.table, derived.districts, derived.sectors
        ));
        Ok(derived)
    }
}
