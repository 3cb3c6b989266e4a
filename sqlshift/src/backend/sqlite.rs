use indexmap::IndexMap;
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;

use crate::backend::{SqlExecutor, SqlRow, SqlValue};
use crate::errors::SqlShiftResult;

/// Default [`SqlExecutor`] over a single rusqlite connection.
///
/// Statement execution is serialized through a mutex; transaction state lives
/// on the connection, so a `begin`/`commit` pair spans any number of
/// interleaved `execute_update` calls from the owning migration run.
pub struct SqliteBackend {
    connection: Mutex<Connection>,
}

impl SqliteBackend {
    /// Opens (or creates) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> SqlShiftResult<Self> {
        let connection = Connection::open(path)?;
        Ok(SqliteBackend {
            connection: Mutex::new(connection),
        })
    }

    /// Opens a private in-memory database, useful for tests.
    pub fn open_in_memory() -> SqlShiftResult<Self> {
        let connection = Connection::open_in_memory()?;
        Ok(SqliteBackend {
            connection: Mutex::new(connection),
        })
    }
}

fn to_rusqlite(value: &SqlValue) -> rusqlite::types::Value {
    match value {
        SqlValue::Null => rusqlite::types::Value::Null,
        SqlValue::Integer(i) => rusqlite::types::Value::Integer(*i),
        SqlValue::Real(f) => rusqlite::types::Value::Real(*f),
        SqlValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
        SqlValue::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    }
}

impl SqlExecutor for SqliteBackend {
    fn execute_update(&self, sql: &str, args: &[SqlValue]) -> SqlShiftResult<usize> {
        let connection = self.connection.lock();
        log::debug!("execute_update: {}", sql);
        let affected =
            connection.execute(sql, rusqlite::params_from_iter(args.iter().map(to_rusqlite)))?;
        Ok(affected)
    }

    fn execute_query(&self, sql: &str, args: &[SqlValue]) -> SqlShiftResult<Vec<SqlRow>> {
        let connection = self.connection.lock();
        log::debug!("execute_query: {}", sql);
        let mut statement = connection.prepare(sql)?;
        let column_names: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = statement.query(rusqlite::params_from_iter(args.iter().map(to_rusqlite)))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut columns = IndexMap::with_capacity(column_names.len());
            for (index, name) in column_names.iter().enumerate() {
                columns.insert(name.clone(), from_value_ref(row.get_ref(index)?));
            }
            result.push(SqlRow::new(columns));
        }
        Ok(result)
    }
}
