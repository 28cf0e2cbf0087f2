use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::{debug, info};

use super::schema_gen::{generate_insert, quote_ident};
use crate::config::ConnectionParams;
use crate::error::{DbContext, Result};
use crate::staging::{SqlValue, StagedTable};

/// Rows between progress callbacks during a bulk insert
const BATCH_SIZE: usize = 1000;

/// The relational store: DDL, bulk insert and scalar/DML execution over one connection
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database and attach the target schema
    pub fn open(params: &ConnectionParams) -> Result<Self> {
        let conn = if params.is_in_memory() {
            Connection::open_in_memory()
        } else {
            Connection::open(params.database_path())
        }
        .db_context(|| format!("opening database {}", params.database))?;

        // Enable foreign keys and optimize for bulk insert
        let journal = if params.is_in_memory() { "MEMORY" } else { "WAL" };
        conn.execute_batch(&format!(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = {};
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
            journal
        ))
        .db_context(|| "configuring connection")?;

        if !params.is_main_schema() {
            let file = if params.is_in_memory() {
                ":memory:".to_string()
            } else {
                params.schema_path().to_string_lossy().into_owned()
            };
            conn.execute(
                &format!("ATTACH DATABASE ?1 AS {}", quote_ident(&params.schema)),
                params![file],
            )
            .db_context(|| format!("attaching schema {}", params.schema))?;
            debug!("Attached schema {} from {}", params.schema, file);
        }

        info!(
            "Connected to {} (schema {})",
            if params.is_in_memory() {
                "in-memory database".to_string()
            } else {
                params.database_path().display().to_string()
            },
            params.schema
        );

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin an explicit write transaction, taking the write lock immediately
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        self.conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context(|| "starting transaction")
    }

    /// Execute a DML statement, returning the number of rows affected
    pub fn execute(&self, sql: &str, context: &str) -> Result<usize> {
        debug!("{}", sql);
        self.conn.execute(sql, []).db_context(|| context.to_string())
    }

    /// Execute several statements as one unit: all take effect or none do
    pub fn execute_atomic(&mut self, statements: &[String], context: &str) -> Result<()> {
        let tx = self.transaction()?;
        for sql in statements {
            debug!("{}", sql);
            tx.execute_batch(sql).db_context(|| context.to_string())?;
        }
        tx.commit().db_context(|| context.to_string())
    }

    pub fn query_scalar_i64(&self, sql: &str, context: &str) -> Result<i64> {
        self.conn
            .query_row(sql, [], |row| row.get(0))
            .db_context(|| context.to_string())
    }

    /// Names among `tables` that already exist in the schema (case-insensitive, as SQLite resolves them)
    pub fn existing_tables(&self, schema: &str, tables: &[&str]) -> Result<Vec<String>> {
        existing_tables(&self.conn, schema, tables)
    }

    pub fn table_exists(&self, schema: &str, table: &str) -> Result<bool> {
        Ok(!self.existing_tables(schema, &[table])?.is_empty())
    }

    /// Column names of a table, in declaration order
    pub fn table_columns(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        let sql = format!("PRAGMA {}.table_info({})", quote_ident(schema), quote_ident(table));
        let mut stmt = self
            .conn
            .prepare(&sql)
            .db_context(|| format!("reading columns of {}.{}", schema, table))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .db_context(|| format!("reading columns of {}.{}", schema, table))?;
        Ok(columns)
    }

    /// Insert every row of a staged table in a single transaction.
    ///
    /// Either all rows are committed or none are.
    pub fn bulk_insert(
        &mut self,
        schema: &str,
        table: &str,
        staged: &StagedTable,
        mut progress: impl FnMut(u64),
    ) -> Result<u64> {
        let insert_sql = generate_insert(schema, table, staged.columns);
        let context = || format!("bulk loading {}.{}", schema, table);

        let tx = self.transaction()?;
        let mut count: u64 = 0;

        for batch in staged.rows.chunks(BATCH_SIZE) {
            insert_batch(&tx, &insert_sql, batch).db_context(context)?;
            count += batch.len() as u64;
            progress(count);
        }

        tx.commit().db_context(context)?;
        Ok(count)
    }
}

/// Execute one or more DDL statements, on the connection or inside a transaction
pub fn execute_ddl(conn: &Connection, sql: &str, context: &str) -> Result<()> {
    debug!("{}", sql);
    conn.execute_batch(sql).db_context(|| context.to_string())
}

/// Existence check usable both on the connection and inside a transaction
pub fn existing_tables(conn: &Connection, schema: &str, tables: &[&str]) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT name FROM {}.sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        quote_ident(schema)
    );
    let mut stmt = conn
        .prepare(&sql)
        .db_context(|| format!("checking for existing tables in schema {}", schema))?;

    let mut existing = Vec::new();
    for table in tables {
        let found: Option<String> = stmt
            .query_row(params![table], |row| row.get(0))
            .optional()
            .db_context(|| format!("checking for table {}.{}", schema, table))?;
        existing.extend(found);
    }
    Ok(existing)
}

/// Insert a batch of rows into the database
fn insert_batch(tx: &Transaction, sql: &str, batch: &[Vec<SqlValue>]) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(sql)?;

    for row in batch {
        for (idx, value) in row.iter().enumerate() {
            value.bind_to(idx + 1, &mut stmt)?;
        }
        stmt.raw_execute()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IN_MEMORY;

    fn store() -> SqliteStore {
        SqliteStore::open(&ConnectionParams::new(IN_MEMORY, "os", "main")).unwrap()
    }

    #[test]
    fn test_existing_tables_is_case_insensitive() {
        let store = store();
        execute_ddl(store.connection(), "CREATE TABLE Places (id INTEGER)", "creating")
            .unwrap();
        assert_eq!(
            store.existing_tables("main", &["places", "counties"]).unwrap(),
            vec!["Places".to_string()]
        );
        assert!(store.table_exists("main", "PLACES").unwrap());
        assert!(!store.table_exists("main", "counties").unwrap());
    }

    #[test]
    fn test_bulk_insert_counts_rows() {
        let mut store = store();
        execute_ddl(store.connection(), "CREATE TABLE t (code TEXT, value REAL)", "creating")
            .unwrap();

        let mut staged = StagedTable::new("t", &["code", "value"]);
        for i in 0..2500 {
            staged
                .rows
                .push(vec![SqlValue::Text(format!("c{}", i)), SqlValue::Real(i as f64)]);
        }

        let mut calls = Vec::new();
        let count = store
            .bulk_insert("main", "t", &staged, |n| calls.push(n))
            .unwrap();

        assert_eq!(count, 2500);
        assert_eq!(calls, vec![1000, 2000, 2500]);
        assert_eq!(
            store.query_scalar_i64("SELECT COUNT(*) FROM t", "counting").unwrap(),
            2500
        );
    }

    #[test]
    fn test_bulk_insert_is_all_or_nothing() {
        let mut store = store();
        execute_ddl(store.connection(), "CREATE TABLE t (code TEXT NOT NULL)", "creating")
            .unwrap();

        let mut staged = StagedTable::new("t", &["code"]);
        staged.rows.push(vec![SqlValue::Text("a".into())]);
        staged.rows.push(vec![SqlValue::Null]);

        assert!(store.bulk_insert("main", "t", &staged, |_| {}).is_err());
        assert_eq!(
            store.query_scalar_i64("SELECT COUNT(*) FROM t", "counting").unwrap(),
            0
        );
    }

    #[test]
    fn test_attached_schema() {
        let store = SqliteStore::open(&ConnectionParams::new(IN_MEMORY, "os", "geo")).unwrap();
        execute_ddl(store.connection(), "CREATE TABLE \"geo\".\"pc\" (a TEXT, b REAL)", "creating")
            .unwrap();
        assert!(store.table_exists("geo", "pc").unwrap());
        assert!(!store.table_exists("main", "pc").unwrap());
        assert_eq!(store.table_columns("geo", "pc").unwrap(), vec!["a", "b"]);
    }
}
