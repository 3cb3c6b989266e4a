//! Schema diffing between two snapshot generations.
//!
//! The differ is a pure function over two [`SchemaSnapshot`] values. It
//! classifies every table into exactly one of {unchanged, added, dropped} and,
//! for every unchanged table, every column into exactly one of the same three
//! sets. The resulting [`SchemaDiff`] is immutable, computed once per
//! migration run, and discarded after application.

use indexmap::IndexMap;

use crate::errors::{ErrorKind, SqlShiftError, SqlShiftResult};
use crate::snapshot::SchemaSnapshot;

/// Column-level classification for one table present in both snapshots.
///
/// Ordering policy: `added_columns` and `unchanged_columns` preserve the order
/// columns appear in the current snapshot; `dropped_columns` preserves the
/// order they appear in the last snapshot. That order governs DDL emission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TableDiff {
    unchanged_columns: Vec<String>,
    added_columns: Vec<String>,
    dropped_columns: Vec<String>,
}

impl TableDiff {
    pub fn unchanged_columns(&self) -> &[String] {
        &self.unchanged_columns
    }

    pub fn added_columns(&self) -> &[String] {
        &self.added_columns
    }

    pub fn dropped_columns(&self) -> &[String] {
        &self.dropped_columns
    }

    pub fn is_noop(&self) -> bool {
        self.added_columns.is_empty() && self.dropped_columns.is_empty()
    }
}

/// Table- and column-level differences between the last applied snapshot and
/// the current one.
///
/// # Invariants
/// - Every table name from either snapshot belongs to exactly one of
///   {unchanged, added, dropped}
/// - `table_diffs` holds an entry for every unchanged table, keyed in
///   current-snapshot order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SchemaDiff {
    unchanged_tables: Vec<String>,
    added_tables: Vec<String>,
    dropped_tables: Vec<String>,
    table_diffs: IndexMap<String, TableDiff>,
}

impl SchemaDiff {
    /// Diffs `last` against `current`.
    ///
    /// When `last` is `None` (first-ever run, no prior version marker) every
    /// table in `current` is classified as added and no column diffing is
    /// performed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSnapshot` if `current` declares no tables.
    pub fn between(
        last: Option<&SchemaSnapshot>,
        current: &SchemaSnapshot,
    ) -> SqlShiftResult<SchemaDiff> {
        if current.is_empty() {
            log::error!("Current snapshot {} declares no tables", current.version());
            return Err(SqlShiftError::new(
                "Current snapshot declares no tables",
                ErrorKind::InvalidSnapshot,
            ));
        }

        let last = match last {
            Some(last) => last,
            None => {
                return Ok(SchemaDiff {
                    unchanged_tables: Vec::new(),
                    added_tables: current
                        .table_names()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    dropped_tables: Vec::new(),
                    table_diffs: IndexMap::new(),
                });
            }
        };

        let mut unchanged_tables = Vec::new();
        let mut added_tables = Vec::new();
        let mut table_diffs = IndexMap::new();

        // Additions and unchanged tables in current-snapshot order
        for table in current.tables() {
            match last.table(table.name()) {
                Some(last_table) => {
                    unchanged_tables.push(table.name().to_string());
                    table_diffs.insert(
                        table.name().to_string(),
                        diff_columns(&last_table.column_names(), &table.column_names()),
                    );
                }
                None => added_tables.push(table.name().to_string()),
            }
        }

        // Removals in last-snapshot order
        let dropped_tables = last
            .table_names()
            .into_iter()
            .filter(|name| !current.contains_table(name))
            .map(str::to_string)
            .collect();

        Ok(SchemaDiff {
            unchanged_tables,
            added_tables,
            dropped_tables,
            table_diffs,
        })
    }

    pub fn unchanged_tables(&self) -> &[String] {
        &self.unchanged_tables
    }

    pub fn added_tables(&self) -> &[String] {
        &self.added_tables
    }

    pub fn dropped_tables(&self) -> &[String] {
        &self.dropped_tables
    }

    pub fn table_diff(&self, table: &str) -> Option<&TableDiff> {
        self.table_diffs.get(table)
    }

    pub fn table_diffs(&self) -> impl Iterator<Item = (&str, &TableDiff)> {
        self.table_diffs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when the two snapshots describe the same logical schema.
    pub fn is_noop(&self) -> bool {
        self.added_tables.is_empty()
            && self.dropped_tables.is_empty()
            && self.table_diffs.values().all(TableDiff::is_noop)
    }
}

fn diff_columns(last: &[&str], current: &[&str]) -> TableDiff {
    let mut unchanged_columns = Vec::new();
    let mut added_columns = Vec::new();

    for column in current {
        if last.contains(column) {
            unchanged_columns.push(column.to_string());
        } else {
            added_columns.push(column.to_string());
        }
    }

    let dropped_columns = last
        .iter()
        .filter(|column| !current.contains(column))
        .map(|column| column.to_string())
        .collect();

    TableDiff {
        unchanged_columns,
        added_columns,
        dropped_columns,
    }
}
