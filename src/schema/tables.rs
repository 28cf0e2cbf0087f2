//! Table definitions for the Code-Point and Scale Gazetteer imports

use super::types::*;

pub const GEO_COLUMN: &str = "geo_location";

// =============================================================================
// Code-Point
// =============================================================================

static POSTCODE_COLUMNS: &[Column] = &[
    Column::required("outward_code", ColumnType::Varchar(4)),
    Column::required("inward_code", ColumnType::Varchar(3)),
    Column::new("longitude", ColumnType::Real),
    Column::new("latitude", ColumnType::Real),
    Column::new(GEO_COLUMN, ColumnType::Point),
];

/// Postcode points, plus the district and sector rows derived after load
pub fn postcode_points(name: &str) -> TableSchema {
    TableSchema {
        name: name.to_string(),
        columns: POSTCODE_COLUMNS,
        primary_key: &["outward_code", "inward_code"],
        foreign_keys: Vec::new(),
        geo_column: Some(GEO_COLUMN),
    }
}

// =============================================================================
// Scale Gazetteer
// =============================================================================

static GAZETTEER_COLUMNS: &[Column] = &[
    Column::required("seq_no", ColumnType::Integer),
    Column::required("place_name", ColumnType::Varchar(60)),
    Column::required("county_code", ColumnType::Char(2)),
    Column::required("feature_code", ColumnType::Varchar(3)),
    Column::new("longitude", ColumnType::Real),
    Column::new("latitude", ColumnType::Real),
    Column::new(GEO_COLUMN, ColumnType::Point),
];

static COUNTY_COLUMNS: &[Column] = &[
    Column::required("code", ColumnType::Char(2)),
    Column::required("name", ColumnType::Varchar(60)),
];

static FEATURE_COLUMNS: &[Column] = &[
    Column::required("code", ColumnType::Varchar(3)),
    Column::required("description", ColumnType::Varchar(50)),
];

/// Named places, keyed by sequence number and referencing both lookups
pub fn gazetteer_points(name: &str, county_table: &str, feature_table: &str) -> TableSchema {
    TableSchema {
        name: name.to_string(),
        columns: GAZETTEER_COLUMNS,
        primary_key: &["seq_no"],
        foreign_keys: vec![
            ForeignKey::new("county_code", county_table),
            ForeignKey::new("feature_code", feature_table),
        ],
        geo_column: Some(GEO_COLUMN),
    }
}

pub fn county_lookup(name: &str) -> TableSchema {
    TableSchema {
        name: name.to_string(),
        columns: COUNTY_COLUMNS,
        primary_key: &["code"],
        foreign_keys: Vec::new(),
        geo_column: None,
    }
}

pub fn feature_lookup(name: &str) -> TableSchema {
    TableSchema {
        name: name.to_string(),
        columns: FEATURE_COLUMNS,
        primary_key: &["code"],
        foreign_keys: Vec::new(),
        geo_column: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postcode_key_columns_exist() {
        let table = postcode_points("postcodes");
        for key in table.primary_key {
            assert!(table.has_column(key), "missing key column {}", key);
        }
        assert_eq!(table.geo_column, Some("geo_location"));
    }

    #[test]
    fn test_gazetteer_references_lookups() {
        let table = gazetteer_points("places", "counties", "features");
        let targets: Vec<_> = table
            .foreign_keys
            .iter()
            .map(|fk| fk.references_table.as_str())
            .collect();
        assert_eq!(targets, vec!["counties", "features"]);
        assert!(table
            .foreign_keys
            .iter()
            .all(|fk| table.has_column(fk.column)));
    }
}
