use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::errors::{ErrorKind, SqlShiftError, SqlShiftResult};
use crate::snapshot::{ColumnSpec, SchemaSnapshot, TableSchema};

/// Parses a versioned migration script into a [`SchemaSnapshot`].
///
/// Only `CREATE TABLE` statements contribute to the snapshot; other statements
/// in the script (seed DML, index creation) are ignored for diffing purposes.
/// The parse is pure and has no side effects.
pub struct SnapshotLoader;

impl SnapshotLoader {
    /// Parses `script` as the schema declaration for `version`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyOrInvalidScript` if the script is blank, fails to parse,
    /// or declares no tables.
    pub fn parse(version: &str, script: &str) -> SqlShiftResult<SchemaSnapshot> {
        if script.trim().is_empty() {
            log::error!("Migration script for version {} is empty", version);
            return Err(SqlShiftError::new(
                &format!("Migration script for version {} is empty", version),
                ErrorKind::EmptyOrInvalidScript,
            ));
        }

        let statements = Parser::parse_sql(&SQLiteDialect {}, script).map_err(|e| {
            log::error!("Failed to parse script for version {}: {}", version, e);
            SqlShiftError::new(
                &format!("Failed to parse script for version {}: {}", version, e),
                ErrorKind::EmptyOrInvalidScript,
            )
        })?;

        let mut tables = Vec::new();
        for statement in &statements {
            if let Statement::CreateTable(create) = statement {
                let table_name = create.name.to_string();
                let mut columns = Vec::with_capacity(create.columns.len());
                for column in &create.columns {
                    let spec = ColumnSpec::new(&column.name.value, &column.to_string());
                    if columns.iter().any(|c: &ColumnSpec| c.name() == spec.name()) {
                        return Err(SqlShiftError::new(
                            &format!(
                                "Column {} declared more than once in table {}",
                                spec.name(),
                                table_name
                            ),
                            ErrorKind::EmptyOrInvalidScript,
                        ));
                    }
                    columns.push(spec);
                }
                tables.push(TableSchema::new(&table_name, columns, &statement.to_string()));
            }
        }

        if tables.is_empty() {
            return Err(SqlShiftError::new(
                &format!("Script for version {} declares no tables", version),
                ErrorKind::EmptyOrInvalidScript,
            ));
        }

        SchemaSnapshot::from_tables(version, tables)
    }
}
