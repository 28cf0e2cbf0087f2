pub mod schema_gen;
pub mod sqlite;

pub use sqlite::SqliteStore;
