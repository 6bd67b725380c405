//! Derived index over the file store.
//!
//! SQLite-backed, colocated with the documents as `index.db`. Rows are
//! pure projections of file contents: the index is never authoritative and
//! `rebuild_all` reconstructs it from the files alone.

pub mod builder;
pub mod db;
pub mod diagnose;
pub mod schema;
pub mod search;
pub mod types;

pub use builder::{enumerate_store, BuilderError, IndexBuilder, RebuildStats, StoreListing};
pub use db::{IndexDb, IndexError};
pub use diagnose::{diagnose, ConsistencyReport, DiagnoseError};
pub use schema::{SchemaError, SCHEMA_VERSION};
pub use search::{search_records, RecordQuery};
pub use types::{NoteRow, RecordRow};
