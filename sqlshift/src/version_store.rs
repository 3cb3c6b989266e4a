//! Version marker persistence.
//!
//! The version marker identifies the last successfully applied snapshot. By
//! default it lives in a reserved single-row bookkeeping table inside the
//! migrated database itself; hosts may substitute any other store (for
//! example application preferences) by implementing [`VersionStore`].

use chrono::Utc;
use std::sync::Arc;

use crate::backend::{SqlExecutor, SqlValue};
use crate::common::{APPLIED_AT_COLUMN, VERSION_COLUMN, VERSION_TABLE};
use crate::errors::SqlShiftResult;

/// An opaque, lexically sortable version identifier, conventionally
/// year-month-day plus a sequence number, e.g. `16061700`.
pub type VersionMarker = String;

/// Persists and retrieves the last-applied version marker.
pub trait VersionStore: Send + Sync {
    /// The last successfully applied marker, or `None` before the first run.
    fn get(&self) -> SqlShiftResult<Option<VersionMarker>>;

    /// Records `marker` as the last successfully applied version.
    fn set(&self, marker: &str) -> SqlShiftResult<()>;
}

/// Default [`VersionStore`] backed by the reserved `tb_sql_version` table.
///
/// The table holds a single row with the current marker and the time it was
/// applied; `set` replaces the row wholesale.
pub struct TableVersionStore {
    executor: Arc<dyn SqlExecutor>,
}

impl TableVersionStore {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        TableVersionStore { executor }
    }

    fn ensure_table(&self) -> SqlShiftResult<()> {
        self.executor.execute_update(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({} TEXT NOT NULL, {} TEXT NOT NULL)",
                VERSION_TABLE, VERSION_COLUMN, APPLIED_AT_COLUMN
            ),
            &[],
        )?;
        Ok(())
    }
}

impl VersionStore for TableVersionStore {
    fn get(&self) -> SqlShiftResult<Option<VersionMarker>> {
        self.ensure_table()?;
        let rows = self.executor.execute_query(
            &format!(
                "SELECT {} FROM {} ORDER BY {} DESC LIMIT 1",
                VERSION_COLUMN, VERSION_TABLE, VERSION_COLUMN
            ),
            &[],
        )?;
        Ok(rows
            .first()
            .and_then(|row| row.get(VERSION_COLUMN))
            .and_then(SqlValue::as_text)
            .map(str::to_string))
    }

    fn set(&self, marker: &str) -> SqlShiftResult<()> {
        self.ensure_table()?;
        self.executor
            .execute_update(&format!("DELETE FROM {}", VERSION_TABLE), &[])?;
        self.executor.execute_update(
            &format!(
                "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
                VERSION_TABLE, VERSION_COLUMN, APPLIED_AT_COLUMN
            ),
            &[
                SqlValue::from(marker),
                SqlValue::from(Utc::now().to_rfc3339()),
            ],
        )?;
        log::info!("Version marker advanced to {}", marker);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;

    fn store() -> TableVersionStore {
        let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
        TableVersionStore::new(backend)
    }

    #[test]
    fn test_get_before_first_run_is_none() {
        let store = store();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let store = store();
        store.set("16061700").unwrap();
        assert_eq!(store.get().unwrap(), Some("16061700".to_string()));
    }

    #[test]
    fn test_set_replaces_single_row() {
        let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
        let store = TableVersionStore::new(backend.clone());

        store.set("16061700").unwrap();
        store.set("16061701").unwrap();
        assert_eq!(store.get().unwrap(), Some("16061701".to_string()));

        let rows = backend
            .execute_query(&format!("SELECT * FROM {}", VERSION_TABLE), &[])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].get(APPLIED_AT_COLUMN).is_some());
    }
}
