use encoding_rs::Encoding;
use std::path::PathBuf;
use tracing::{debug, info};

use super::{Importer, STAGE_PROGRESS_INTERVAL};
use crate::config::{DatasetKind, GazetteerJob};
use crate::error::Result;
use crate::parser::{resolve_encoding, RecordReader, SourceFormat};
use crate::schema::{county_lookup, feature_lookup, gazetteer_points, TableSchema};
use crate::staging::{StagedDataset, StagedTable};
use crate::transform::{
    feature_lookups, parse_gazetteer_record, CountyAccumulator, FeatureLookup, GAZETTEER_FIELDS,
};
use crate::ui::Ui;

/// Imports the 1:50 000 gazetteer with its county and feature lookup tables
pub struct GazetteerImporter {
    table: String,
    county_table: String,
    feature_table: String,
    data_file: PathBuf,
    encoding: &'static Encoding,
    features: Vec<FeatureLookup>,
}

impl GazetteerImporter {
    pub fn new(job: &GazetteerJob) -> Result<Self> {
        let encoding = resolve_encoding(&job.encoding)?;
        debug!("Gazetteer encoding: {}", encoding.name());

        Ok(Self {
            table: job.table.clone(),
            county_table: job.county_table.clone(),
            feature_table: job.feature_table.clone(),
            data_file: job.data_file.clone(),
            encoding,
            features: feature_lookups()?,
        })
    }
}

impl Importer for GazetteerImporter {
    fn kind(&self) -> DatasetKind {
        DatasetKind::Gazetteer
    }

    fn tables(&self) -> Vec<TableSchema> {
        vec![
            gazetteer_points(&self.table, &self.county_table, &self.feature_table),
            county_lookup(&self.county_table),
            feature_lookup(&self.feature_table),
        ]
    }

    fn stage(&self, ui: &mut impl Ui) -> Result<StagedDataset> {
        let reader = RecordReader::new(
            vec![self.data_file.clone()],
            SourceFormat::colon_separated(GAZETTEER_FIELDS, self.encoding),
        );

        let mut points = Vec::new();
        let mut counties = CountyAccumulator::new();
        for record in reader {
            let (point, county) = parse_gazetteer_record(&record?)?;
            points.push(point);
            counties.observe(county);
            if points.len() % STAGE_PROGRESS_INTERVAL == 0 {
                ui.set_progress(points.len() as u64, 0, "Gazetteer records");
            }
        }
        ui.clear_progress();

        info!(
            "Staged {} places in {} counties, {} feature codes",
            points.len(),
            counties.len(),
            self.features.len()
        );
        ui.log(format!("Read {} places in {} counties", points.len(), counties.len()));

        Ok(StagedDataset::new(vec![
            StagedTable::from_rows(self.table.as_str(), &points),
            StagedTable::from_rows(self.county_table.as_str(), &counties.into_counties()),
            StagedTable::from_rows(self.feature_table.as_str(), &self.features),
        ]))
    }
}
