//! # sqlshift - Versioned SQLite Schema Migration
//!
//! sqlshift detects differences between the last applied table/column layout
//! and the one declared by versioned SQL migration scripts, applies the
//! additive/destructive schema changes in dependency-safe order inside one
//! transaction, and records the new version marker.
//!
//! ## How a run works
//!
//! 1. Read the last applied version marker (version store, or the host's
//!    prepare hook)
//! 2. Parse the last and current migration scripts into schema snapshots
//! 3. Diff the snapshots: tables and columns classified as added, dropped,
//!    or unchanged
//! 4. Apply the DDL in order (create tables, add columns, drop columns when
//!    enabled, drop tables) inside a single transaction
//! 5. Persist the new version marker and notify the completion hook
//!
//! A failed run rolls back wholesale and never advances the marker, so the
//! migration is re-attempted on the next process start.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sqlshift::migrator::MigrationExecutor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = MigrationExecutor::builder()
//!     .sqlite_file("app.db")
//!     .script_dir("migration_sql")
//!     .on_complete(|outcome| {
//!         log::info!("migration finished: {:?}", outcome.status());
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let outcome = executor.run()?;
//! assert!(outcome.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`backend`] - SQL execution backend trait and the rusqlite default
//! - [`common`] - Shared constants and helpers
//! - [`diff`] - Pure schema diffing between snapshot generations
//! - [`errors`] - Error types and result definitions
//! - [`migrator`] - Migration executor, lifecycle hooks, and builder
//! - [`scripts`] - Versioned script resolution
//! - [`snapshot`] - Schema snapshots and the script parser
//! - [`version_store`] - Version marker persistence

pub mod backend;
pub mod common;
pub mod diff;
pub mod errors;
pub mod migrator;
pub mod scripts;
pub mod snapshot;
pub mod version_store;

pub use backend::{SqlExecutor, SqlRow, SqlValue, SqliteBackend};
pub use diff::{SchemaDiff, TableDiff};
pub use errors::{ErrorKind, SqlShiftError, SqlShiftResult};
pub use migrator::{
    MigrationExecutor, MigrationHooks, MigrationOutcome, MigrationState, MigrationStatus,
    MigratorBuilder,
};
pub use scripts::ScriptRepository;
pub use snapshot::{ColumnSpec, SchemaSnapshot, SnapshotLoader, TableSchema};
pub use version_store::{TableVersionStore, VersionMarker, VersionStore};
