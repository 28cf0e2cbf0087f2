pub mod headers;
pub mod record;

pub use headers::{ColumnHeaders, CodePointLayout};
pub use record::{discover_files, resolve_encoding, FieldCount, RawRecord, RecordReader, SourceFormat};
