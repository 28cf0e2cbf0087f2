use serde::Deserialize;
use std::collections::HashSet;

use crate::error::{ImportError, Result};
use crate::parser::{FieldCount, RawRecord};
use crate::staging::{SqlValue, StageRow};

// Field positions in the colon-separated gazetteer file
const SEQ_NO: usize = 0;
const PLACE_NAME: usize = 2;
const LAT_DEGREES: usize = 4;
const LAT_MINUTES: usize = 5;
const LON_DEGREES: usize = 6;
const LON_MINUTES: usize = 7;
const HEMISPHERE: usize = 10;
const COUNTY_CODE: usize = 11;
const COUNTY_NAME: usize = 13;
const FEATURE_CODE: usize = 14;

pub const GAZETTEER_FIELDS: FieldCount = FieldCount::AtLeast(FEATURE_CODE + 1);

/// Hemisphere indicator marking longitudes west of Greenwich
pub const WEST: &str = "W";

static FEATURE_CODES_JSON: &str = include_str!("../../data/feature_codes.json");

/// One named place from the gazetteer
#[derive(Debug, Clone, PartialEq)]
pub struct GazetteerPoint {
    pub seq_no: i64,
    pub place_name: String,
    pub county_code: String,
    pub feature_code: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl StageRow for GazetteerPoint {
    const COLUMNS: &'static [&'static str] = &[
        "seq_no",
        "place_name",
        "county_code",
        "feature_code",
        "longitude",
        "latitude",
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.seq_no.into(),
            self.place_name.as_str().into(),
            self.county_code.as_str().into(),
            self.feature_code.as_str().into(),
            self.longitude.into(),
            self.latitude.into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountyLookup {
    pub code: String,
    pub name: String,
}

impl StageRow for CountyLookup {
    const COLUMNS: &'static [&'static str] = &["code", "name"];

    fn values(&self) -> Vec<SqlValue> {
        vec![self.code.as_str().into(), self.name.as_str().into()]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureLookup {
    pub code: String,
    pub description: String,
}

impl StageRow for FeatureLookup {
    const COLUMNS: &'static [&'static str] = &["code", "description"];

    fn values(&self) -> Vec<SqlValue> {
        vec![self.code.as_str().into(), self.description.as_str().into()]
    }
}

/// Parse a gazetteer record into its point and the county it names
pub fn parse_gazetteer_record(record: &RawRecord) -> Result<(GazetteerPoint, CountyLookup)> {
    let seq_no = record.parse_i64(SEQ_NO, "sequence number")?;
    let latitude = degrees_minutes(
        record.parse_f64(LAT_DEGREES, "latitude degrees")?,
        record.parse_f64(LAT_MINUTES, "latitude minutes")?,
    );
    let longitude = degrees_minutes(
        record.parse_f64(LON_DEGREES, "longitude degrees")?,
        record.parse_f64(LON_MINUTES, "longitude minutes")?,
    );
    let longitude = apply_hemisphere(longitude, record.field(HEMISPHERE)?);

    let county_code = record.field(COUNTY_CODE)?.to_string();
    let point = GazetteerPoint {
        seq_no,
        place_name: record.field(PLACE_NAME)?.to_string(),
        county_code: county_code.clone(),
        feature_code: record.field(FEATURE_CODE)?.to_string(),
        longitude,
        latitude,
    };
    let county = CountyLookup {
        code: county_code,
        name: record.field(COUNTY_NAME)?.to_string(),
    };

    Ok((point, county))
}

pub fn degrees_minutes(degrees: f64, minutes: f64) -> f64 {
    degrees + minutes / 60.0
}

/// Negate a longitude recorded west of Greenwich; the match is case-sensitive
pub fn apply_hemisphere(longitude: f64, hemisphere: &str) -> f64 {
    if hemisphere == WEST {
        -longitude
    } else {
        longitude
    }
}

/// Distinct counties in the order first seen; the first name for a code wins
#[derive(Debug, Default)]
pub struct CountyAccumulator {
    seen: HashSet<String>,
    counties: Vec<CountyLookup>,
}

impl CountyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the county code had not been seen before
    pub fn observe(&mut self, county: CountyLookup) -> bool {
        if self.seen.contains(&county.code) {
            return false;
        }
        self.seen.insert(county.code.clone());
        self.counties.push(county);
        true
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counties.is_empty()
    }

    pub fn into_counties(self) -> Vec<CountyLookup> {
        self.counties
    }
}

/// The feature code reference table bundled with the crate
pub fn feature_lookups() -> Result<Vec<FeatureLookup>> {
    serde_json::from_str(FEATURE_CODES_JSON)
        .map_err(|e| ImportError::config(format!("Invalid bundled feature code table: {}", e)))
}
