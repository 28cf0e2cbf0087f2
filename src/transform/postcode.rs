use crate::error::Result;
use crate::geo::CoordinateTransformer;
use crate::parser::{CodePointLayout, RawRecord};
use crate::staging::{SqlValue, StageRow};

/// One Code-Point postcode centroid
#[derive(Debug, Clone, PartialEq)]
pub struct PostcodePoint {
    pub outward_code: String,
    pub inward_code: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl PostcodePoint {
    pub fn from_record<C>(record: &RawRecord, layout: &CodePointLayout, converter: &C) -> Result<Self>
    where
        C: CoordinateTransformer + ?Sized,
    {
        let easting = record.parse_i64(layout.easting, "easting")?;
        let northing = record.parse_i64(layout.northing, "northing")?;
        let (longitude, latitude) = converter.convert(easting as f64, northing as f64);

        let (outward_code, inward_code) = split_postcode(record.field(layout.postcode)?);

        Ok(Self {
            outward_code,
            inward_code,
            longitude,
            latitude,
        })
    }
}

impl StageRow for PostcodePoint {
    const COLUMNS: &'static [&'static str] = &["outward_code", "inward_code", "longitude", "latitude"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.outward_code.as_str().into(),
            self.inward_code.as_str().into(),
            self.longitude.into(),
            self.latitude.into(),
        ]
    }
}

/// Split a postcode into outward and inward codes.
///
/// With a space: outward is everything before the first space, inward everything
/// after the last one. Without: outward is the first 4 characters, inward the next 3.
pub fn split_postcode(postcode: &str) -> (String, String) {
    let postcode = postcode.trim();
    match (postcode.find(' '), postcode.rfind(' ')) {
        (Some(first), Some(last)) => (
            postcode[..first].to_string(),
            postcode[last + 1..].to_string(),
        ),
        _ => (
            postcode.chars().take(4).collect(),
            postcode.chars().skip(4).take(3).collect(),
        ),
    }
}

pub fn join_postcode(outward: &str, inward: &str) -> String {
    format!("{} {}", outward, inward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    fn record(fields: &[&str]) -> RawRecord {
        RawRecord {
            file: Arc::from(Path::new("test.csv")),
            line: 1,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_split_with_space() {
        assert_eq!(split_postcode("AB1 2CD"), ("AB1".into(), "2CD".into()));
        assert_eq!(split_postcode("N1  6AA"), ("N1".into(), "6AA".into()));
        assert_eq!(split_postcode("EC1A 1BB"), ("EC1A".into(), "1BB".into()));
    }

    #[test]
    fn test_split_without_space() {
        assert_eq!(split_postcode("AB101AA"), ("AB10".into(), "1AA".into()));
        assert_eq!(split_postcode("AB1"), ("AB1".into(), "".into()));
    }

    #[test]
    fn test_join_normalises_separator() {
        let (outward, inward) = split_postcode("N1  6AA");
        assert_eq!(join_postcode(&outward, &inward), "N1 6AA");
    }

    #[test]
    fn test_from_record_uses_layout_and_converter() {
        let layout = CodePointLayout {
            postcode: 0,
            easting: 2,
            northing: 3,
            fields: crate::parser::FieldCount::Exactly(4),
        };
        let converter = |e: f64, n: f64| (e / 100_000.0, n / 100_000.0);
        let point =
            PostcodePoint::from_record(&record(&["AB1 2CD", "10", "100000", "200000"]), &layout, &converter)
                .unwrap();

        assert_eq!(point.outward_code, "AB1");
        assert_eq!(point.inward_code, "2CD");
        assert_eq!(point.longitude, 1.0);
        assert_eq!(point.latitude, 2.0);
    }

    #[test]
    fn test_non_integer_easting_is_malformed() {
        let layout = CodePointLayout {
            postcode: 0,
            easting: 1,
            northing: 2,
            fields: crate::parser::FieldCount::Exactly(3),
        };
        let converter = |e: f64, n: f64| (e, n);
        let err = PostcodePoint::from_record(&record(&["AB1 2CD", "1.5e", "2"]), &layout, &converter)
            .unwrap_err();
        assert!(err.to_string().contains("easting"));
    }
}
