use tracing::{debug, info};

use crate::error::{DbContext, ImportError, Result};
use crate::schema::TableSchema;
use crate::writer::schema_gen::{generate_create_table, reserved_names, Constraints};
use crate::writer::sqlite::{execute_ddl, existing_tables, SqliteStore};

/// Create every table of a dataset, or none of them.
///
/// The existence check and the CREATE statements run in one immediate
/// transaction. If any table the import would create, including the rebuild
/// copies and spatial indexes made while finalizing, already exists, nothing
/// is created.
pub fn provision(store: &mut SqliteStore, schema: &str, tables: &[TableSchema]) -> Result<()> {
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    let context = format!("creating tables {} in schema {}", names.join(", "), schema);

    let reserved: Vec<String> = tables.iter().flat_map(reserved_names).collect();
    let reserved: Vec<&str> = reserved.iter().map(String::as_str).collect();

    let tx = store.transaction()?;

    let existing = existing_tables(&tx, schema, &reserved)?;
    if !existing.is_empty() {
        debug!("Conflicting tables in {}: {}", schema, existing.join(", "));
        return Err(ImportError::TableAlreadyExists {
            schema: schema.to_string(),
            tables: existing,
        });
    }

    for table in tables {
        let sql = generate_create_table(schema, table, &table.name, Constraints::None);
        execute_ddl(&tx, &sql, &context)?;
    }

    tx.commit().db_context(|| context)?;
    info!("Created {} table(s) in schema {}: {}", tables.len(), schema, names.join(", "));
    Ok(())
}
