use crate::backend::SqlExecutor;
use crate::diff::SchemaDiff;
use crate::errors::SqlShiftResult;
use crate::migrator::MigrationOutcome;
use crate::snapshot::SchemaSnapshot;
use crate::version_store::VersionMarker;

/// Supplies the last-applied version marker from host-owned storage,
/// overriding the default version-store lookup. Returning `None` means no
/// version has ever been applied.
pub type PrepareHook = Box<dyn Fn() -> SqlShiftResult<Option<VersionMarker>> + Send + Sync>;

/// Replaces the default DDL application for one run. The hook runs inside the
/// run's transaction; returning an error rolls the whole run back.
pub type ExecuteHook = Box<dyn Fn(&ApplyContext<'_>) -> SqlShiftResult<()> + Send + Sync>;

/// Receives the terminal [`MigrationOutcome`] of every run. Required.
pub type CompleteHook = Box<dyn Fn(&MigrationOutcome) -> SqlShiftResult<()> + Send + Sync>;

/// Everything a custom execute hook needs to apply a migration itself:
/// the computed diff, both snapshots, and the backend scoped to the run's
/// open transaction.
pub struct ApplyContext<'a> {
    executor: &'a dyn SqlExecutor,
    diff: &'a SchemaDiff,
    current: &'a SchemaSnapshot,
    last: Option<&'a SchemaSnapshot>,
}

impl<'a> ApplyContext<'a> {
    pub(crate) fn new(
        executor: &'a dyn SqlExecutor,
        diff: &'a SchemaDiff,
        current: &'a SchemaSnapshot,
        last: Option<&'a SchemaSnapshot>,
    ) -> Self {
        ApplyContext {
            executor,
            diff,
            current,
            last,
        }
    }

    pub fn executor(&self) -> &dyn SqlExecutor {
        self.executor
    }

    pub fn diff(&self) -> &SchemaDiff {
        self.diff
    }

    pub fn current_snapshot(&self) -> &SchemaSnapshot {
        self.current
    }

    pub fn last_snapshot(&self) -> Option<&SchemaSnapshot> {
        self.last
    }
}

/// Host lifecycle hooks for a migration run.
///
/// `prepare` and `execute` default to built-in strategies when unset (read
/// the version store; apply the diff as DDL). `complete` must always be set.
#[derive(Default)]
pub struct MigrationHooks {
    prepare: Option<PrepareHook>,
    execute: Option<ExecuteHook>,
    complete: Option<CompleteHook>,
}

impl MigrationHooks {
    pub fn new() -> Self {
        MigrationHooks::default()
    }

    pub fn on_prepare<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> SqlShiftResult<Option<VersionMarker>> + Send + Sync + 'static,
    {
        self.prepare = Some(Box::new(hook));
        self
    }

    pub fn on_execute<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ApplyContext<'_>) -> SqlShiftResult<()> + Send + Sync + 'static,
    {
        self.execute = Some(Box::new(hook));
        self
    }

    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&MigrationOutcome) -> SqlShiftResult<()> + Send + Sync + 'static,
    {
        self.complete = Some(Box::new(hook));
        self
    }

    pub fn prepare(&self) -> Option<&PrepareHook> {
        self.prepare.as_ref()
    }

    pub fn execute(&self) -> Option<&ExecuteHook> {
        self.execute.as_ref()
    }

    pub fn complete(&self) -> Option<&CompleteHook> {
        self.complete.as_ref()
    }
}
