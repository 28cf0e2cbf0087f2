use rusqlite::params;
use tracing::info;

use crate::error::{DbContext, Result};
use crate::writer::schema_gen::qualified;
use crate::writer::sqlite::SqliteStore;

/// Rows added for postcode districts and sectors
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedRows {
    pub districts: u64,
    pub sectors: u64,
}

impl DerivedRows {
    pub fn total(&self) -> u64 {
        self.districts + self.sectors
    }
}

/// Insert one row per postcode district (outward code, empty inward code) and
/// per sector (outward code, first inward character), each at the mean
/// longitude/latitude of the committed points it covers.
///
/// Reads the loaded table rather than the staged rows, so the averages are
/// exactly those of the queryable data. Must run once, before any derived rows exist.
pub fn aggregate_districts_and_sectors(
    store: &mut SqliteStore,
    schema: &str,
    table: &str,
) -> Result<DerivedRows> {
    let target = qualified(schema, table);
    let context = || format!("calculating districts and sectors for {}.{}", schema, table);

    let tx = store.transaction()?;

    let districts: i64 = tx
        .query_row(
            &format!("SELECT COUNT(DISTINCT outward_code) FROM {}", target),
            params![],
            |row| row.get(0),
        )
        .db_context(context)?;

    // SQLite materializes the SELECT before inserting into its own source table
    let inserted = tx
        .execute(
            &format!(
                "INSERT INTO {target} (outward_code, inward_code, longitude, latitude)
                 SELECT outward_code, '', AVG(longitude), AVG(latitude)
                 FROM {target}
                 GROUP BY outward_code
                 UNION ALL
                 SELECT outward_code, substr(inward_code, 1, 1), AVG(longitude), AVG(latitude)
                 FROM {target}
                 WHERE inward_code <> ''
                 GROUP BY outward_code, substr(inward_code, 1, 1)",
                target = target
            ),
            params![],
        )
        .db_context(context)?;

    tx.commit().db_context(context)?;

    let derived = DerivedRows {
        districts: districts as u64,
        sectors: (inserted as u64).saturating_sub(districts as u64),
    };
    info!(
        "Added {} district and {} sector rows to {}.{}",
        derived.districts, derived.sectors, schema, table
    );
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionParams, IN_MEMORY};
    use crate::pipeline::provision::provision;
    use crate::schema::postcode_points;

    fn seeded(points: &[(&str, &str, f64, f64)]) -> SqliteStore {
        let mut store = SqliteStore::open(&ConnectionParams::new(IN_MEMORY, "os", "main")).unwrap();
        provision(&mut store, "main", &[postcode_points("pc")]).unwrap();
        for (outward, inward, lon, lat) in points {
            store
                .connection()
                .execute(
                    "INSERT INTO pc (outward_code, inward_code, longitude, latitude) VALUES (?1, ?2, ?3, ?4)",
                    params![outward, inward, lon, lat],
                )
                .unwrap();
        }
        store
    }

    fn coords(store: &SqliteStore, outward: &str, inward: &str) -> (f64, f64) {
        store
            .connection()
            .query_row(
                "SELECT longitude, latitude FROM pc WHERE outward_code = ?1 AND inward_code = ?2",
                params![outward, inward],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap()
    }

    #[test]
    fn test_district_is_mean_of_points() {
        let mut store = seeded(&[
            ("AB1", "2CD", -2.10, 57.10),
            ("AB1", "3EF", -2.20, 57.30),
            ("AB1", "3GH", -2.30, 57.20),
            ("AB2", "1AA", -1.00, 56.00),
        ]);

        let derived = aggregate_districts_and_sectors(&mut store, "main", "pc").unwrap();
        assert_eq!(derived.districts, 2);
        // AB1 2, AB1 3, AB2 1
        assert_eq!(derived.sectors, 3);

        let (lon, lat) = coords(&store, "AB1", "");
        assert!((lon - (-2.10 - 2.20 - 2.30) / 3.0).abs() < 1e-9);
        assert!((lat - (57.10 + 57.30 + 57.20) / 3.0).abs() < 1e-9);

        let (lon, lat) = coords(&store, "AB1", "3");
        assert!((lon - (-2.25)).abs() < 1e-9);
        assert!((lat - 57.25).abs() < 1e-9);

        let (lon, _) = coords(&store, "AB2", "");
        assert!((lon - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_row_counts_after_aggregation() {
        let mut store = seeded(&[("AB1", "2CD", 0.0, 0.0), ("AB1", "3EF", 1.0, 1.0)]);
        let derived = aggregate_districts_and_sectors(&mut store, "main", "pc").unwrap();
        assert_eq!(derived.total(), 3);
        assert_eq!(
            store.query_scalar_i64("SELECT COUNT(*) FROM pc", "counting").unwrap(),
            5
        );
    }
}
