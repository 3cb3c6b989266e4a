use indexmap::IndexMap;

use crate::errors::SqlShiftResult;

/// A typed SQL parameter value.
///
/// Parameters are passed as an explicit ordered sequence alongside the SQL
/// string; the backend performs the substitution, preventing injection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Blob(value)
    }
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// One result row, keyed by column name in select order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SqlRow {
    columns: IndexMap<String, SqlValue>,
}

impl SqlRow {
    pub fn new(columns: IndexMap<String, SqlValue>) -> Self {
        SqlRow { columns }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Executes parameterized statements against a single SQLite database.
///
/// Calls are synchronous and blocking; any internal serialization of the
/// underlying connection is opaque to callers. `execute_update` must be usable
/// within a transactional scope spanning multiple calls, which the default
/// transaction methods establish with explicit statements.
pub trait SqlExecutor: Send + Sync {
    /// Executes an update/DDL statement, returning the number of affected rows.
    fn execute_update(&self, sql: &str, args: &[SqlValue]) -> SqlShiftResult<usize>;

    /// Executes a query, returning all result rows.
    fn execute_query(&self, sql: &str, args: &[SqlValue]) -> SqlShiftResult<Vec<SqlRow>>;

    fn begin_transaction(&self) -> SqlShiftResult<()> {
        self.execute_update("BEGIN IMMEDIATE TRANSACTION", &[]).map(|_| ())
    }

    fn commit_transaction(&self) -> SqlShiftResult<()> {
        self.execute_update("COMMIT TRANSACTION", &[]).map(|_| ())
    }

    fn rollback_transaction(&self) -> SqlShiftResult<()> {
        self.execute_update("ROLLBACK TRANSACTION", &[]).map(|_| ())
    }
}
