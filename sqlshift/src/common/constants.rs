// library identity constants
pub const LIB_NAME: &str = "sqlshift";
pub const LIB_DESC: &str = "versioned SQLite schema migration";
pub const LIB_VERSION: &str = env!("CARGO_PKG_VERSION");

// version bookkeeping constants
pub const VERSION_TABLE: &str = "tb_sql_version";
pub const VERSION_COLUMN: &str = "sql_version";
pub const APPLIED_AT_COLUMN: &str = "applied_at";

// script resolution constants
pub const DEFAULT_SCRIPT_DIR: &str = "migration_sql";
pub const SCRIPT_EXTENSION: &str = "sql";

pub const RESERVED_TABLES: [&str; 1] = [VERSION_TABLE];
