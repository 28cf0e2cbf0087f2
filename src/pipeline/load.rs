use tracing::info;

use crate::error::{ImportError, Result};
use crate::staging::StagedTable;
use crate::ui::Ui;
use crate::writer::sqlite::SqliteStore;

/// Load a whole staged table into an existing table in one transaction.
///
/// Staged columns are matched to destination columns by name; a staged
/// column with no counterpart fails the load before anything is written.
pub fn load(
    store: &mut SqliteStore,
    staged: &StagedTable,
    schema: &str,
    table_name: &str,
    ui: &mut impl Ui,
) -> Result<u64> {
    let destination = store.table_columns(schema, table_name)?;
    for column in staged.columns {
        if !destination.iter().any(|d| d.eq_ignore_ascii_case(column)) {
            return Err(ImportError::SchemaMismatch {
                table: format!("{}.{}", schema, table_name),
                column: column.to_string(),
            });
        }
    }

    info!("Bulk loading {} rows into {}.{}", staged.len(), schema, table_name);
    let total = staged.len() as u64;
    let label = table_name.to_string();
    let count = store.bulk_insert(schema, table_name, staged, |n| {
        ui.set_progress(n, total, label.as_str())
    })?;
    ui.clear_progress();
    ui.log(format!("{}.{}: {} rows inserted", schema, table_name, count));

    Ok(count)
}
