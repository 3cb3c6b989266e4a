//! Schema snapshots parsed from versioned migration scripts.
//!
//! A snapshot is the full set of tables and columns declared by one versioned
//! migration script. Snapshots are immutable once loaded; the migration
//! executor produces one for the last applied version and one for the current
//! version on every run, diffs them, and discards both afterwards.

mod loader;
mod schema_snapshot;

pub use loader::SnapshotLoader;
pub use schema_snapshot::{ColumnSpec, SchemaSnapshot, TableSchema};
