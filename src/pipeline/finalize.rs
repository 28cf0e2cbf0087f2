//! Post-load steps: geo column, keys, spatial index.
//!
//! Each step commits on its own. A failing step aborts the run and leaves the
//! earlier steps in place; the table is then partially finalized and has to
//! be repaired or dropped by hand.

use tracing::info;

use crate::error::Result;
use crate::schema::TableSchema;
use crate::ui::Ui;
use crate::writer::schema_gen::{
    generate_rebuild, generate_spatial_index, qualified, quote_ident, spatial_index_name,
    Constraints,
};
use crate::writer::sqlite::SqliteStore;

/// Set the WKT point of every row from its longitude/latitude.
///
/// Coordinates are written with 17 significant digits so the text parses
/// back to the stored doubles.
pub fn set_geo_column(store: &SqliteStore, schema: &str, table: &TableSchema) -> Result<usize> {
    let Some(geo) = table.geo_column else {
        return Ok(0);
    };
    let updated = store.execute(
        &format!(
            "UPDATE {} SET {} = printf('POINT(%!.17g %!.17g)', longitude, latitude) \
             WHERE longitude IS NOT NULL AND latitude IS NOT NULL",
            qualified(schema, &table.name),
            quote_ident(geo)
        ),
        &format!("setting {} on {}.{}", geo, schema, table.name),
    )?;
    info!("Set {} on {} rows of {}.{}", geo, updated, schema, table.name);
    Ok(updated)
}

/// Add the table's primary key by rebuilding it with the constraint
pub fn add_primary_key(store: &mut SqliteStore, schema: &str, table: &TableSchema) -> Result<()> {
    store.execute_atomic(
        &generate_rebuild(schema, table, Constraints::PrimaryKey),
        &format!(
            "adding primary key ({}) to {}.{}",
            table.primary_key.join(", "),
            schema,
            table.name
        ),
    )?;
    info!("Set PRIMARY KEY on {}.{}", schema, table.name);
    Ok(())
}

/// Add the table's foreign keys; every referenced lookup must already have its primary key
pub fn add_foreign_keys(store: &mut SqliteStore, schema: &str, table: &TableSchema) -> Result<()> {
    if table.foreign_keys.is_empty() {
        return Ok(());
    }
    let targets: Vec<&str> = table
        .foreign_keys
        .iter()
        .map(|fk| fk.references_table.as_str())
        .collect();
    store.execute_atomic(
        &generate_rebuild(schema, table, Constraints::PrimaryAndForeignKeys),
        &format!(
            "adding foreign keys from {}.{} to {}",
            schema,
            table.name,
            targets.join(", ")
        ),
    )?;
    info!("Set FOREIGN KEY from {} to {}", table.name, targets.join(", "));
    Ok(())
}

/// Build the R*Tree index over the geo column. Runs last so rowids are final.
pub fn create_spatial_index(store: &mut SqliteStore, schema: &str, table: &TableSchema) -> Result<()> {
    let Some(geo) = table.geo_column else {
        return Ok(());
    };
    store.execute_atomic(
        &generate_spatial_index(schema, &table.name, geo),
        &format!("creating spatial index on {}.{}({})", schema, table.name, geo),
    )?;
    info!(
        "Created spatial index {} on {}.{}",
        spatial_index_name(&table.name, geo),
        schema,
        table.name
    );
    Ok(())
}

/// Run all post-load steps in order for a primary table and its lookups
pub fn finalize(
    store: &mut SqliteStore,
    schema: &str,
    primary: &TableSchema,
    lookups: &[TableSchema],
    ui: &mut impl Ui,
) -> Result<()> {
    if let Some(geo) = primary.geo_column {
        ui.log(format!("Setting {} on {}", geo, primary.name));
        set_geo_column(store, schema, primary)?;
    }

    for table in std::iter::once(primary).chain(lookups) {
        ui.log(format!("Setting PRIMARY KEY on {}", table.name));
        add_primary_key(store, schema, table)?;
    }

    if !primary.foreign_keys.is_empty() {
        ui.log(format!("Setting FOREIGN KEYs on {}", primary.name));
        add_foreign_keys(store, schema, primary)?;
    }

    if primary.geo_column.is_some() {
        ui.log(format!("Creating spatial index on {}", primary.name));
        create_spatial_index(store, schema, primary)?;
    }

    Ok(())
}
