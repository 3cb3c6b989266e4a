use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::{SqlExecutor, SqliteBackend};
use crate::common::DEFAULT_SCRIPT_DIR;
use crate::errors::{ErrorKind, SqlShiftError, SqlShiftResult};
use crate::migrator::hooks::ApplyContext;
use crate::migrator::{MigrationExecutor, MigrationHooks, MigrationOutcome};
use crate::scripts::ScriptRepository;
use crate::version_store::{TableVersionStore, VersionMarker, VersionStore};

/// Builder for a [`MigrationExecutor`].
///
/// Follows the capture-first-error builder pattern: configuration errors are
/// recorded and returned from [`MigratorBuilder::build`], keeping the fluent
/// chain panic-free.
///
/// # Examples
///
/// ```rust,ignore
/// let executor = MigrationExecutor::builder()
///     .sqlite_file("app.db")
///     .script_dir("migration_sql")
///     .on_complete(|outcome| {
///         println!("migrated to {:?}", outcome.to_version());
///         Ok(())
///     })
///     .build()?;
/// executor.run()?;
/// ```
pub struct MigratorBuilder {
    error: Option<SqlShiftError>,
    backend: Option<Arc<dyn SqlExecutor>>,
    version_store: Option<Arc<dyn VersionStore>>,
    script_dir: PathBuf,
    hooks: MigrationHooks,
    column_drop_supported: bool,
}

impl Default for MigratorBuilder {
    fn default() -> Self {
        MigratorBuilder::new()
    }
}

impl MigratorBuilder {
    pub fn new() -> Self {
        MigratorBuilder {
            error: None,
            backend: None,
            version_store: None,
            script_dir: PathBuf::from(DEFAULT_SCRIPT_DIR),
            hooks: MigrationHooks::new(),
            column_drop_supported: false,
        }
    }

    /// Sets the SQL execution backend. Required unless [`Self::sqlite_file`]
    /// is used.
    pub fn backend(mut self, backend: Arc<dyn SqlExecutor>) -> Self {
        if self.error.is_none() {
            self.backend = Some(backend);
        }
        self
    }

    /// Convenience for the default backend: opens (or creates) the SQLite
    /// database file at `path`.
    pub fn sqlite_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        if self.error.is_none() {
            match SqliteBackend::open(path.into()) {
                Ok(backend) => self.backend = Some(Arc::new(backend)),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Overrides the default table-backed version store.
    pub fn version_store(mut self, store: Arc<dyn VersionStore>) -> Self {
        if self.error.is_none() {
            self.version_store = Some(store);
        }
        self
    }

    /// Sets the directory containing versioned migration scripts.
    /// Defaults to `migration_sql`.
    pub fn script_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        if self.error.is_none() {
            let dir = dir.into();
            if dir.as_os_str().is_empty() {
                self.error = Some(SqlShiftError::new(
                    "Script directory must not be empty",
                    ErrorKind::ValidationError,
                ));
            } else {
                self.script_dir = dir;
            }
        }
        self
    }

    /// Enables emission of `ALTER TABLE ... DROP COLUMN` for dropped columns.
    /// Off by default; requires a SQLite dialect that supports column drop.
    pub fn column_drop_supported(mut self, supported: bool) -> Self {
        if self.error.is_none() {
            self.column_drop_supported = supported;
        }
        self
    }

    /// Sets the optional prepare hook; see [`MigrationHooks`].
    pub fn on_prepare<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> SqlShiftResult<Option<VersionMarker>> + Send + Sync + 'static,
    {
        if self.error.is_none() {
            self.hooks = self.hooks.on_prepare(hook);
        }
        self
    }

    /// Sets the optional execute hook; see [`MigrationHooks`].
    pub fn on_execute<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ApplyContext<'_>) -> SqlShiftResult<()> + Send + Sync + 'static,
    {
        if self.error.is_none() {
            self.hooks = self.hooks.on_execute(hook);
        }
        self
    }

    /// Sets the required complete hook; see [`MigrationHooks`].
    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&MigrationOutcome) -> SqlShiftResult<()> + Send + Sync + 'static,
    {
        if self.error.is_none() {
            self.hooks = self.hooks.on_complete(hook);
        }
        self
    }

    /// Finalizes the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first captured configuration error, `ValidationError` when
    /// no backend was provided, or `DelegateMissing` when no complete hook
    /// was set.
    pub fn build(self) -> SqlShiftResult<MigrationExecutor> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let backend = self.backend.ok_or_else(|| {
            SqlShiftError::new(
                "SQL execution backend is required",
                ErrorKind::ValidationError,
            )
        })?;
        if self.hooks.complete().is_none() {
            return Err(SqlShiftError::new(
                "Completion hook must be implemented",
                ErrorKind::DelegateMissing,
            ));
        }
        let version_store = self
            .version_store
            .unwrap_or_else(|| Arc::new(TableVersionStore::new(backend.clone())));

        Ok(MigrationExecutor::new(
            backend,
            version_store,
            ScriptRepository::new(self.script_dir),
            self.hooks,
            self.column_drop_supported,
        ))
    }
}
