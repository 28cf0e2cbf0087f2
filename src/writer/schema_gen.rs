use crate::schema::TableSchema;

/// Which key constraints to emit in a CREATE TABLE statement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraints {
    /// Bare table, as provisioned before the bulk load
    None,
    PrimaryKey,
    PrimaryAndForeignKeys,
}

/// Quote an identifier for SQLite
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Schema-qualified, quoted table reference
pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate CREATE TABLE SQL for a table schema under the given table name
pub fn generate_create_table(
    schema: &str,
    table: &TableSchema,
    name: &str,
    constraints: Constraints,
) -> String {
    let mut sql = format!("CREATE TABLE {} (\n", qualified(schema, name));
    let mut columns = Vec::new();

    for col in table.columns {
        let null_constraint = if !col.nullable { " NOT NULL" } else { "" };
        columns.push(format!(
            "    {} {}{}",
            quote_ident(col.name),
            col.col_type.sql_type(),
            null_constraint
        ));
    }

    if constraints != Constraints::None && !table.primary_key.is_empty() {
        columns.push(format!(
            "    CONSTRAINT {} PRIMARY KEY ({})",
            quote_ident(&format!("pk_{}", table.name)),
            column_list(table.primary_key)
        ));
    }

    if constraints == Constraints::PrimaryAndForeignKeys {
        for fk in &table.foreign_keys {
            // SQLite resolves the parent table within the child's own schema
            columns.push(format!(
                "    CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
                quote_ident(&format!("fk_{}_{}", table.name, fk.references_table)),
                quote_ident(fk.column),
                quote_ident(&fk.references_table),
                quote_ident(fk.references_column)
            ));
        }
    }

    sql.push_str(&columns.join(",\n"));
    sql.push_str("\n)");

    sql
}

/// Generate the INSERT statement used by the bulk loader
pub fn generate_insert(schema: &str, table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified(schema, table),
        column_list(columns),
        placeholders.join(", ")
    )
}

/// Generate the statements that rebuild a table in place with the requested constraints
pub fn generate_rebuild(schema: &str, table: &TableSchema, constraints: Constraints) -> Vec<String> {
    let temp_name = rebuild_name(&table.name);
    let columns = column_list(&table.column_names());

    vec![
        generate_create_table(schema, table, &temp_name, constraints),
        format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            qualified(schema, &temp_name),
            columns,
            columns,
            qualified(schema, &table.name)
        ),
        format!("DROP TABLE {}", qualified(schema, &table.name)),
        format!(
            "ALTER TABLE {} RENAME TO {}",
            qualified(schema, &temp_name),
            quote_ident(&table.name)
        ),
    ]
}

/// Name a table is copied to while its constraints are added
pub fn rebuild_name(table: &str) -> String {
    format!("{}__rebuild", table)
}

/// Name of the R*Tree table indexing a table's geo column
pub fn spatial_index_name(table: &str, geo_column: &str) -> String {
    format!("{}_{}_idx", table, geo_column)
}

/// Every table name an import of `table` creates along the way: the table
/// itself, its rebuild copy, and the R*Tree index with its shadow tables
pub fn reserved_names(table: &TableSchema) -> Vec<String> {
    let mut names = vec![table.name.clone(), rebuild_name(&table.name)];
    if let Some(geo) = table.geo_column {
        let index = spatial_index_name(&table.name, geo);
        for shadow in ["node", "rowid", "parent"] {
            names.push(format!("{}_{}", index, shadow));
        }
        names.push(index);
    }
    names
}

/// Generate the R*Tree spatial index and the statement that fills it
pub fn generate_spatial_index(schema: &str, table: &str, geo_column: &str) -> Vec<String> {
    let index = qualified(schema, &spatial_index_name(table, geo_column));
    vec![
        format!(
            "CREATE VIRTUAL TABLE {} USING rtree(id, min_lon, max_lon, min_lat, max_lat)",
            index
        ),
        format!(
            "INSERT INTO {} (id, min_lon, max_lon, min_lat, max_lat) \
             SELECT rowid, longitude, longitude, latitude, latitude FROM {} \
             WHERE {} IS NOT NULL",
            index,
            qualified(schema, table),
            quote_ident(geo_column)
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{gazetteer_points, postcode_points};

    #[test]
    fn test_generate_bare_table() {
        let sql = generate_create_table(
            "main",
            &postcode_points("postcodes"),
            "postcodes",
            Constraints::None,
        );
        assert!(sql.contains("CREATE TABLE \"main\".\"postcodes\""));
        assert!(sql.contains("\"outward_code\" VARCHAR(4) NOT NULL"));
        assert!(sql.contains("\"geo_location\" TEXT"));
        assert!(!sql.contains("PRIMARY KEY"));
    }

    #[test]
    fn test_generate_keys() {
        let table = gazetteer_points("places", "counties", "features");
        let sql = generate_create_table("main", &table, "places", Constraints::PrimaryKey);
        assert!(sql.contains("CONSTRAINT \"pk_places\" PRIMARY KEY (\"seq_no\")"));
        assert!(!sql.contains("FOREIGN KEY"));

        let sql =
            generate_create_table("main", &table, "places", Constraints::PrimaryAndForeignKeys);
        assert!(sql.contains(
            "CONSTRAINT \"fk_places_counties\" FOREIGN KEY (\"county_code\") REFERENCES \"counties\"(\"code\")"
        ));
        assert!(sql.contains("REFERENCES \"features\"(\"code\")"));
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_generate_rebuild_renames_back() {
        let stmts = generate_rebuild("geo", &postcode_points("pc"), Constraints::PrimaryKey);
        assert_eq!(stmts.len(), 4);
        assert!(stmts[0].contains("\"geo\".\"pc__rebuild\""));
        assert_eq!(stmts[2], "DROP TABLE \"geo\".\"pc\"");
        assert_eq!(stmts[3], "ALTER TABLE \"geo\".\"pc__rebuild\" RENAME TO \"pc\"");
    }

    #[test]
    fn test_reserved_names_cover_rebuild_and_index() {
        let names = reserved_names(&postcode_points("pc"));
        assert_eq!(names[..2], ["pc".to_string(), "pc__rebuild".to_string()]);
        assert!(names.contains(&"pc_geo_location_idx".to_string()));
        assert!(names.contains(&"pc_geo_location_idx_parent".to_string()));

        let lookup = crate::schema::county_lookup("counties");
        assert_eq!(reserved_names(&lookup), vec!["counties", "counties__rebuild"]);
    }

    #[test]
    fn test_generate_insert() {
        let sql = generate_insert("main", "counties", &["code", "name"]);
        assert_eq!(
            sql,
            "INSERT INTO \"main\".\"counties\" (\"code\", \"name\") VALUES (?, ?)"
        );
    }
}
