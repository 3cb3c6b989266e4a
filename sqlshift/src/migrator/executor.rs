use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::SqlExecutor;
use crate::common::{atomic, Atomic};
use crate::diff::SchemaDiff;
use crate::errors::{ErrorKind, SqlShiftError, SqlShiftResult};
use crate::migrator::hooks::ApplyContext;
use crate::migrator::{MigrationHooks, MigrationOutcome, MigratorBuilder};
use crate::scripts::ScriptRepository;
use crate::snapshot::SchemaSnapshot;
use crate::version_store::{VersionMarker, VersionStore};

/// Lifecycle stage of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Idle,
    Preparing,
    Diffing,
    Applying,
    Completing,
    Succeeded,
    Failed,
}

/// Drives versioned schema migration end to end.
///
/// Construct through [`MigrationExecutor::builder`]. A single executor guards
/// against concurrent runs on its database; `run` is synchronous and blocks
/// until the migration succeeds or fails.
pub struct MigrationExecutor {
    backend: Arc<dyn SqlExecutor>,
    version_store: Arc<dyn VersionStore>,
    scripts: ScriptRepository,
    hooks: MigrationHooks,
    column_drop_supported: bool,
    running: AtomicBool,
    state: Atomic<MigrationState>,
}

impl MigrationExecutor {
    pub(crate) fn new(
        backend: Arc<dyn SqlExecutor>,
        version_store: Arc<dyn VersionStore>,
        scripts: ScriptRepository,
        hooks: MigrationHooks,
        column_drop_supported: bool,
    ) -> Self {
        MigrationExecutor {
            backend,
            version_store,
            scripts,
            hooks,
            column_drop_supported,
            running: AtomicBool::new(false),
            state: atomic(MigrationState::Idle),
        }
    }

    pub fn builder() -> MigratorBuilder {
        MigratorBuilder::new()
    }

    /// The stage the most recent run reached.
    pub fn state(&self) -> MigrationState {
        *self.state.read()
    }

    fn set_state(&self, state: MigrationState) {
        *self.state.write() = state;
    }

    /// Runs one migration pass.
    ///
    /// On success the returned outcome carries the old and new version
    /// markers. On failure the error is returned after the completion hook
    /// has been notified; a failed run never advances the version marker.
    ///
    /// # Errors
    ///
    /// `MigrationInProgress` when another run is already in flight,
    /// `DelegateMissing` when no completion hook is configured, otherwise the
    /// classified error of the failing stage.
    pub fn run(&self) -> SqlShiftResult<MigrationOutcome> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SqlShiftError::new(
                "A migration run is already in flight",
                ErrorKind::MigrationInProgress,
            ));
        }
        let result = self.run_guarded();
        self.running.store(false, Ordering::SeqCst);
        result
    }

    fn run_guarded(&self) -> SqlShiftResult<MigrationOutcome> {
        self.set_state(MigrationState::Preparing);
        if self.hooks.complete().is_none() {
            self.set_state(MigrationState::Failed);
            return Err(SqlShiftError::new(
                "Completion hook must be implemented",
                ErrorKind::DelegateMissing,
            ));
        }

        let mut from_version = None;
        let result = self.run_stages(&mut from_version);
        let outcome = match &result {
            Ok(outcome) => {
                self.set_state(MigrationState::Succeeded);
                outcome.clone()
            }
            Err(error) => {
                log::error!("Migration run failed: {}", error);
                self.set_state(MigrationState::Failed);
                MigrationOutcome::failed(from_version.clone(), error.clone())
            }
        };

        if let Some(complete) = self.hooks.complete() {
            if let Err(hook_error) = complete(&outcome) {
                self.set_state(MigrationState::Failed);
                return Err(hook_error);
            }
        }
        result
    }

    fn run_stages(
        &self,
        from_version: &mut Option<VersionMarker>,
    ) -> SqlShiftResult<MigrationOutcome> {
        // Preparing: the host hook overrides the default version-store lookup
        let last_marker = match self.hooks.prepare() {
            Some(prepare) => prepare()?,
            None => self.version_store.get()?,
        };
        *from_version = last_marker.clone();
        log::info!(
            "Starting migration run, last applied version: {}",
            last_marker.as_deref().unwrap_or("<none>")
        );

        // Diffing
        self.set_state(MigrationState::Diffing);
        let latest = self.scripts.latest()?.ok_or_else(|| {
            SqlShiftError::new("No migration scripts available", ErrorKind::ResourceNotFound)
        })?;

        if let Some(marker) = &last_marker {
            if marker.as_str() >= latest.as_str() {
                log::info!("Schema already at version {}, nothing to apply", marker);
                return Ok(MigrationOutcome::noop(marker.clone()));
            }
        }

        let last_snapshot = match &last_marker {
            Some(marker) => Some(self.scripts.load(marker).map_err(|e| {
                if e.kind() == &ErrorKind::ResourceNotFound {
                    SqlShiftError::new_with_cause(
                        &format!(
                            "Version marker {} is recorded but its script cannot be resolved",
                            marker
                        ),
                        ErrorKind::VersionMarkerInconsistent,
                        e,
                    )
                } else {
                    e
                }
            })?),
            None => None,
        };
        let current = self.scripts.load(&latest)?;
        let diff = SchemaDiff::between(last_snapshot.as_ref(), &current)?;

        // Applying: one transaction per run, rolled back wholesale on failure
        self.set_state(MigrationState::Applying);
        self.backend.begin_transaction()?;
        let apply_result = match self.hooks.execute() {
            Some(execute) => execute(&ApplyContext::new(
                self.backend.as_ref(),
                &diff,
                &current,
                last_snapshot.as_ref(),
            )),
            None => self.apply_default(&diff, &current),
        };
        // A failed COMMIT must release the transaction too, otherwise the
        // next run on the same connection fails at BEGIN
        let apply_result = apply_result.and_then(|()| self.backend.commit_transaction());
        if let Err(cause) = apply_result {
            if let Err(rollback_error) = self.backend.rollback_transaction() {
                log::error!("Rollback failed after apply error: {}", rollback_error);
            }
            let kind = if last_marker.is_none() {
                ErrorKind::SchemaInitFailed
            } else {
                ErrorKind::DdlApplicationFailed
            };
            return Err(SqlShiftError::new_with_cause(
                &format!(
                    "Applying schema version {} failed, transaction rolled back",
                    latest
                ),
                kind,
                cause,
            ));
        }

        // Completing: the marker write is the last action of the run
        self.set_state(MigrationState::Completing);
        self.version_store.set(&latest).map_err(|e| {
            SqlShiftError::new_with_cause(
                &format!(
                    "Schema version {} applied but the version marker could not be persisted",
                    latest
                ),
                ErrorKind::VersionPersistFailed,
                e,
            )
        })?;

        log::info!(
            "Migration run complete: {} -> {}",
            last_marker.as_deref().unwrap_or("<none>"),
            latest
        );
        Ok(MigrationOutcome::succeeded(last_marker, latest))
    }

    fn apply_default(&self, diff: &SchemaDiff, current: &SchemaSnapshot) -> SqlShiftResult<()> {
        for sql in plan_ddl(diff, current, self.column_drop_supported)? {
            log::debug!("Applying DDL: {}", sql);
            self.backend.execute_update(&sql, &[])?;
        }
        Ok(())
    }
}

/// Emits the DDL sequence for a diff in dependency-safe order:
/// (a) create added tables with their full column sets, (b) add added columns
/// to unchanged tables, (c) drop dropped columns when the dialect capability
/// is enabled, (d) drop dropped tables.
///
/// With `column_drop_supported` off, dropped columns are logged and left in
/// place; the logical schema still converges, so the marker may advance.
pub fn plan_ddl(
    diff: &SchemaDiff,
    current: &SchemaSnapshot,
    column_drop_supported: bool,
) -> SqlShiftResult<Vec<String>> {
    let mut statements = Vec::new();

    for table in diff.added_tables() {
        let schema = current.table(table).ok_or_else(|| {
            SqlShiftError::new(
                &format!("Added table {} missing from current snapshot", table),
                ErrorKind::InternalError,
            )
        })?;
        statements.push(schema.create_sql().to_string());
    }

    for (table, table_diff) in diff.table_diffs() {
        let schema = current.table(table).ok_or_else(|| {
            SqlShiftError::new(
                &format!("Unchanged table {} missing from current snapshot", table),
                ErrorKind::InternalError,
            )
        })?;
        for column in table_diff.added_columns() {
            let spec = schema.column(column).ok_or_else(|| {
                SqlShiftError::new(
                    &format!("Added column {}.{} missing from current snapshot", table, column),
                    ErrorKind::InternalError,
                )
            })?;
            statements.push(format!(
                "ALTER TABLE {} ADD COLUMN {}",
                table,
                spec.definition()
            ));
        }
    }

    for (table, table_diff) in diff.table_diffs() {
        for column in table_diff.dropped_columns() {
            if column_drop_supported {
                statements.push(format!("ALTER TABLE {} DROP COLUMN {}", table, column));
            } else {
                log::warn!(
                    "Column {}.{} was removed from the schema but column drop is disabled, leaving it in place",
                    table,
                    column
                );
            }
        }
    }

    for table in diff.dropped_tables() {
        statements.push(format!("DROP TABLE {}", table));
    }

    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotLoader;

    fn snapshot(version: &str, script: &str) -> SchemaSnapshot {
        SnapshotLoader::parse(version, script).unwrap()
    }

    // ==================== plan_ddl Ordering Tests ====================

    #[test]
    fn test_plan_orders_creates_before_alters_before_drops() {
        let last = snapshot(
            "1",
            "CREATE TABLE tb_user (userId TEXT, userName TEXT, userCellphone TEXT);\n\
             CREATE TABLE tb_media (id TEXT);",
        );
        let current = snapshot(
            "2",
            "CREATE TABLE tb_user (userId TEXT, userName TEXT, userAge INTEGER);\n\
             CREATE TABLE tb_product (id INTEGER, name TEXT);",
        );
        let diff = SchemaDiff::between(Some(&last), &current).unwrap();

        let statements = plan_ddl(&diff, &current, true).unwrap();
        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with("CREATE TABLE tb_product"));
        assert_eq!(
            statements[1],
            "ALTER TABLE tb_user ADD COLUMN userAge INTEGER"
        );
        assert_eq!(
            statements[2],
            "ALTER TABLE tb_user DROP COLUMN userCellphone"
        );
        assert_eq!(statements[3], "DROP TABLE tb_media");
    }

    #[test]
    fn test_plan_skips_column_drop_when_unsupported() {
        let last = snapshot("1", "CREATE TABLE tb_user (userId TEXT, userCellphone TEXT);");
        let current = snapshot("2", "CREATE TABLE tb_user (userId TEXT);");
        let diff = SchemaDiff::between(Some(&last), &current).unwrap();

        let statements = plan_ddl(&diff, &current, false).unwrap();
        assert!(statements.is_empty());

        let statements = plan_ddl(&diff, &current, true).unwrap();
        assert_eq!(
            statements,
            vec!["ALTER TABLE tb_user DROP COLUMN userCellphone".to_string()]
        );
    }

    #[test]
    fn test_plan_first_run_creates_everything_in_order() {
        let current = snapshot(
            "1",
            "CREATE TABLE tb_user (userId TEXT);\nCREATE TABLE tb_product (id INTEGER);",
        );
        let diff = SchemaDiff::between(None, &current).unwrap();

        let statements = plan_ddl(&diff, &current, false).unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE tb_user"));
        assert!(statements[1].starts_with("CREATE TABLE tb_product"));
    }

    #[test]
    fn test_plan_noop_diff_is_empty() {
        let script = "CREATE TABLE tb_user (userId TEXT);";
        let last = snapshot("1", script);
        let current = snapshot("2", script);
        let diff = SchemaDiff::between(Some(&last), &current).unwrap();

        let statements = plan_ddl(&diff, &current, true).unwrap();
        assert!(statements.is_empty());
    }

    #[test]
    fn test_plan_uses_column_definition_text() {
        let last = snapshot("1", "CREATE TABLE tb_user (userId TEXT);");
        let current = snapshot(
            "2",
            "CREATE TABLE tb_user (userId TEXT, userAge INTEGER NOT NULL DEFAULT 0);",
        );
        let diff = SchemaDiff::between(Some(&last), &current).unwrap();

        let statements = plan_ddl(&diff, &current, false).unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("ADD COLUMN userAge INTEGER NOT NULL DEFAULT 0"));
    }
}
