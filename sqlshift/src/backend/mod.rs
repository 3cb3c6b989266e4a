//! SQL execution backend abstractions.
//!
//! The migration executor talks to the database through the [`SqlExecutor`]
//! trait only. The default implementation, [`SqliteBackend`], serializes
//! access to a single rusqlite connection; hosts may plug in any other
//! backend capable of running DDL/DML statements transactionally.

mod sql_executor;
mod sqlite;

pub use sql_executor::{SqlExecutor, SqlRow, SqlValue};
pub use sqlite::SqliteBackend;
