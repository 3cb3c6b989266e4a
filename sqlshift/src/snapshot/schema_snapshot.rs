use indexmap::IndexMap;

use crate::errors::{ErrorKind, SqlShiftError, SqlShiftResult};

/// A single column declared by a `CREATE TABLE` statement.
///
/// # Fields
/// * `name` - column name as declared in the script
/// * `definition` - full column-def text (name, type, and constraints), reused
///   verbatim when emitting `ALTER TABLE ... ADD COLUMN`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ColumnSpec {
    name: String,
    definition: String,
}

impl ColumnSpec {
    pub fn new(name: &str, definition: &str) -> Self {
        ColumnSpec {
            name: name.to_string(),
            definition: definition.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }
}

/// One table's declared schema: ordered columns plus the originating
/// `CREATE TABLE` text, reused verbatim when the table is created.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnSpec>,
    create_sql: String,
}

impl TableSchema {
    pub fn new(name: &str, columns: Vec<ColumnSpec>, create_sql: &str) -> Self {
        TableSchema {
            name: name.to_string(),
            columns,
            create_sql: create_sql.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn create_sql(&self) -> &str {
        &self.create_sql
    }
}

/// The full logical schema declared by one versioned migration script.
///
/// # Characteristics
/// - Immutable once loaded, produced fresh per migration run
/// - Table and column order matches declaration order in the script; that
///   order later governs DDL application order for added tables and columns
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SchemaSnapshot {
    version: String,
    tables: IndexMap<String, TableSchema>,
}

impl SchemaSnapshot {
    /// Builds a snapshot from tables in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `EmptyOrInvalidScript` if two tables share a name.
    pub fn from_tables(version: &str, tables: Vec<TableSchema>) -> SqlShiftResult<Self> {
        let mut map = IndexMap::with_capacity(tables.len());
        for table in tables {
            let name = table.name().to_string();
            if map.insert(name.clone(), table).is_some() {
                log::error!("Table {} declared more than once in version {}", name, version);
                return Err(SqlShiftError::new(
                    &format!("Table {} declared more than once", name),
                    ErrorKind::EmptyOrInvalidScript,
                ));
            }
        }
        Ok(SchemaSnapshot {
            version: version.to_string(),
            tables: map,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Table names in declaration order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|k| k.as_str()).collect()
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
