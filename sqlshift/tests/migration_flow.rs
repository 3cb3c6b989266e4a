//! End-to-end migration runs against in-memory SQLite databases with
//! on-disk script directories.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use sqlshift::{
    ErrorKind, MigrationExecutor, MigrationState, MigrationStatus, SqlExecutor, SqlRow, SqlValue,
    SqliteBackend, TableVersionStore, VersionStore,
};
use tempfile::TempDir;

#[ctor::ctor]
fn init_logger() {
    colog::init();
}

const V1_SCRIPT: &str = "\
CREATE TABLE tb_user (userId TEXT PRIMARY KEY, userName TEXT, userCellphone TEXT);
CREATE TABLE tb_media (id INTEGER PRIMARY KEY, path TEXT);
";

const V2_SCRIPT: &str = "\
CREATE TABLE tb_user (userId TEXT PRIMARY KEY, userName TEXT, userSex TEXT, userAge INTEGER);
CREATE TABLE tb_product (id INTEGER PRIMARY KEY, name TEXT);
";

fn write_script(dir: &Path, version: &str, content: &str) {
    fs::write(dir.join(format!("{}.sql", version)), content).unwrap();
}

fn column_names(backend: &dyn SqlExecutor, table: &str) -> Vec<String> {
    backend
        .execute_query(&format!("PRAGMA table_info({})", table), &[])
        .unwrap()
        .iter()
        .filter_map(|row| row.get("name").and_then(SqlValue::as_text))
        .map(str::to_string)
        .collect()
}

fn table_exists(backend: &dyn SqlExecutor, table: &str) -> bool {
    let rows = backend
        .execute_query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            &[SqlValue::from(table)],
        )
        .unwrap();
    !rows.is_empty()
}

fn executor_for(
    backend: Arc<dyn SqlExecutor>,
    scripts: &TempDir,
) -> sqlshift::MigratorBuilder {
    MigrationExecutor::builder()
        .backend(backend)
        .script_dir(scripts.path())
        .on_complete(|_| Ok(()))
}

#[test]
fn test_first_run_creates_full_schema_and_marker() {
    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let executor = executor_for(backend.clone(), &scripts).build().unwrap();

    let outcome = executor.run().unwrap();
    assert_eq!(outcome.status(), MigrationStatus::Succeeded);
    assert!(outcome.applied());
    assert_eq!(outcome.from_version(), None);
    assert_eq!(outcome.to_version(), Some("16061700"));
    assert_eq!(executor.state(), MigrationState::Succeeded);

    assert!(table_exists(backend.as_ref(), "tb_user"));
    assert!(table_exists(backend.as_ref(), "tb_media"));

    let store = TableVersionStore::new(backend.clone());
    assert_eq!(store.get().unwrap(), Some("16061700".to_string()));
}

#[test]
fn test_upgrade_adds_tables_and_columns() {
    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    executor_for(backend.clone(), &scripts)
        .build()
        .unwrap()
        .run()
        .unwrap();

    // seed a row so the upgrade provably preserves existing data
    backend
        .execute_update(
            "INSERT INTO tb_user (userId, userName, userCellphone) VALUES (?1, ?2, ?3)",
            &[
                SqlValue::from("u1"),
                SqlValue::from("sunbeam"),
                SqlValue::from("13800000000"),
            ],
        )
        .unwrap();

    write_script(scripts.path(), "16061701", V2_SCRIPT);
    let outcome = executor_for(backend.clone(), &scripts)
        .build()
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(outcome.from_version(), Some("16061700"));
    assert_eq!(outcome.to_version(), Some("16061701"));

    // tb_product created, new columns added, dropped table gone
    assert!(table_exists(backend.as_ref(), "tb_product"));
    assert!(!table_exists(backend.as_ref(), "tb_media"));

    let columns = column_names(backend.as_ref(), "tb_user");
    assert!(columns.contains(&"userSex".to_string()));
    assert!(columns.contains(&"userAge".to_string()));
    // column drop disabled by default, the removed column stays in place
    assert!(columns.contains(&"userCellphone".to_string()));

    let rows = backend
        .execute_query("SELECT userName FROM tb_user WHERE userId = ?1", &[
            SqlValue::from("u1"),
        ])
        .unwrap();
    assert_eq!(
        rows[0].get("userName").and_then(SqlValue::as_text),
        Some("sunbeam")
    );
}

#[test]
fn test_column_drop_executes_when_enabled() {
    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    executor_for(backend.clone(), &scripts)
        .build()
        .unwrap()
        .run()
        .unwrap();

    write_script(scripts.path(), "16061701", V2_SCRIPT);
    executor_for(backend.clone(), &scripts)
        .column_drop_supported(true)
        .build()
        .unwrap()
        .run()
        .unwrap();

    let columns = column_names(backend.as_ref(), "tb_user");
    assert!(!columns.contains(&"userCellphone".to_string()));
    assert!(columns.contains(&"userSex".to_string()));
}

#[test]
fn test_second_run_at_latest_version_is_noop() {
    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let executor = executor_for(backend.clone(), &scripts).build().unwrap();

    executor.run().unwrap();
    let outcome = executor.run().unwrap();
    assert!(outcome.is_success());
    assert!(!outcome.applied());
    assert_eq!(outcome.from_version(), Some("16061700"));
    assert_eq!(outcome.to_version(), Some("16061700"));
}

#[test]
fn test_failed_apply_rolls_back_and_keeps_marker() {
    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);
    write_script(scripts.path(), "16061701", V2_SCRIPT);

    // claim version 16061700 without the schema actually existing, so the
    // ALTER TABLE statements in the upgrade must fail
    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let completions = Arc::new(Mutex::new(Vec::new()));
    let completions_clone = completions.clone();

    let executor = MigrationExecutor::builder()
        .backend(backend.clone())
        .script_dir(scripts.path())
        .on_prepare(|| Ok(Some("16061700".to_string())))
        .on_complete(move |outcome| {
            completions_clone.lock().unwrap().push((
                outcome.status(),
                outcome.from_version().map(str::to_string),
            ));
            Ok(())
        })
        .build()
        .unwrap();

    let result = executor.run();
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), &ErrorKind::DdlApplicationFailed);
    }
    assert_eq!(executor.state(), MigrationState::Failed);

    // the completion hook still saw the failed outcome, including the
    // version the failed upgrade started from
    assert_eq!(
        *completions.lock().unwrap(),
        vec![(MigrationStatus::Failed, Some("16061700".to_string()))]
    );

    // transaction rolled back: the added table from step (a) must not exist
    assert!(!table_exists(backend.as_ref(), "tb_product"));

    // the version marker was never advanced
    let store = TableVersionStore::new(backend.clone());
    assert_eq!(store.get().unwrap(), None);
}

#[test]
fn test_recorded_marker_without_script_is_fatal() {
    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061701", V2_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let executor = executor_for(backend.clone(), &scripts)
        .on_prepare(|| Ok(Some("16061700".to_string())))
        .build()
        .unwrap();

    let result = executor.run();
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), &ErrorKind::VersionMarkerInconsistent);
    }
}

#[test]
fn test_missing_script_directory_is_fatal() {
    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let executor = MigrationExecutor::builder()
        .backend(backend)
        .script_dir("/definitely/not/a/script/dir")
        .on_complete(|_| Ok(()))
        .build()
        .unwrap();

    let result = executor.run();
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), &ErrorKind::ResourceNotFound);
    }
}

#[test]
fn test_execute_hook_replaces_default_apply() {
    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let executor = executor_for(backend.clone(), &scripts)
        .on_execute(|context| {
            // custom migration: create only the first declared table
            let first = context
                .current_snapshot()
                .tables()
                .next()
                .map(|t| t.create_sql().to_string());
            if let Some(sql) = first {
                context.executor().execute_update(&sql, &[])?;
            }
            Ok(())
        })
        .build()
        .unwrap();

    let outcome = executor.run().unwrap();
    assert!(outcome.is_success());

    // the default DDL sequence did not run, only the hook's statement did
    assert!(table_exists(backend.as_ref(), "tb_user"));
    assert!(!table_exists(backend.as_ref(), "tb_media"));

    // the marker still advanced because the hook owned the apply step
    let store = TableVersionStore::new(backend.clone());
    assert_eq!(store.get().unwrap(), Some("16061700".to_string()));
}

#[test]
fn test_custom_version_store_is_consulted() {
    struct FixedStore(Mutex<Option<String>>);

    impl VersionStore for FixedStore {
        fn get(&self) -> sqlshift::SqlShiftResult<Option<String>> {
            Ok(self.0.lock().unwrap().clone())
        }

        fn set(&self, marker: &str) -> sqlshift::SqlShiftResult<()> {
            *self.0.lock().unwrap() = Some(marker.to_string());
            Ok(())
        }
    }

    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let store = Arc::new(FixedStore(Mutex::new(None)));

    let executor = executor_for(backend.clone(), &scripts)
        .version_store(store.clone())
        .build()
        .unwrap();
    executor.run().unwrap();

    assert_eq!(store.get().unwrap(), Some("16061700".to_string()));
    // the reserved bookkeeping table is untouched when the store is custom
    assert!(!table_exists(backend.as_ref(), "tb_sql_version"));
}

#[test]
fn test_complete_hook_error_fails_the_run() {
    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let executor = MigrationExecutor::builder()
        .backend(backend)
        .script_dir(scripts.path())
        .on_complete(|_| {
            Err(sqlshift::SqlShiftError::new(
                "host rejected the outcome",
                ErrorKind::InternalError,
            ))
        })
        .build()
        .unwrap();

    let result = executor.run();
    assert!(result.is_err());
    assert_eq!(executor.state(), MigrationState::Failed);
}

#[test]
fn test_reentrant_run_is_rejected() {
    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let slot: Arc<OnceLock<Arc<MigrationExecutor>>> = Arc::new(OnceLock::new());
    let nested_kind = Arc::new(Mutex::new(None));

    let slot_in_hook = slot.clone();
    let nested_kind_in_hook = nested_kind.clone();
    let executor = Arc::new(
        executor_for(backend.clone(), &scripts)
            .on_execute(move |context| {
                // a second run started while this one holds the guard
                if let Some(executor) = slot_in_hook.get() {
                    if let Err(e) = executor.run() {
                        *nested_kind_in_hook.lock().unwrap() = Some(e.kind().clone());
                    }
                }
                for table in context.current_snapshot().tables() {
                    context.executor().execute_update(table.create_sql(), &[])?;
                }
                Ok(())
            })
            .build()
            .unwrap(),
    );
    assert!(slot.set(executor.clone()).is_ok());

    let outcome = executor.run().unwrap();
    assert!(outcome.is_success());
    assert_eq!(
        *nested_kind.lock().unwrap(),
        Some(ErrorKind::MigrationInProgress)
    );
    assert!(table_exists(backend.as_ref(), "tb_user"));
}

#[test]
fn test_version_persist_failure_after_commit() {
    struct RefusingStore;

    impl VersionStore for RefusingStore {
        fn get(&self) -> sqlshift::SqlShiftResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, _marker: &str) -> sqlshift::SqlShiftResult<()> {
            Err(sqlshift::SqlShiftError::new(
                "marker storage unavailable",
                ErrorKind::BackendError,
            ))
        }
    }

    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let completions = Arc::new(Mutex::new(Vec::new()));
    let completions_clone = completions.clone();

    let executor = MigrationExecutor::builder()
        .backend(backend.clone())
        .script_dir(scripts.path())
        .version_store(Arc::new(RefusingStore))
        .on_complete(move |outcome| {
            completions_clone.lock().unwrap().push(outcome.status());
            Ok(())
        })
        .build()
        .unwrap();

    let result = executor.run();
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), &ErrorKind::VersionPersistFailed);
    }
    assert_eq!(executor.state(), MigrationState::Failed);

    // the schema change was already committed when the marker write failed
    assert!(table_exists(backend.as_ref(), "tb_user"));

    assert_eq!(*completions.lock().unwrap(), vec![MigrationStatus::Failed]);
}

#[test]
fn test_failed_commit_releases_transaction() {
    struct CommitRefusingBackend {
        inner: SqliteBackend,
    }

    impl SqlExecutor for CommitRefusingBackend {
        fn execute_update(&self, sql: &str, args: &[SqlValue]) -> sqlshift::SqlShiftResult<usize> {
            self.inner.execute_update(sql, args)
        }

        fn execute_query(
            &self,
            sql: &str,
            args: &[SqlValue],
        ) -> sqlshift::SqlShiftResult<Vec<SqlRow>> {
            self.inner.execute_query(sql, args)
        }

        fn commit_transaction(&self) -> sqlshift::SqlShiftResult<()> {
            Err(sqlshift::SqlShiftError::new(
                "commit rejected by backend",
                ErrorKind::BackendError,
            ))
        }
    }

    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(CommitRefusingBackend {
        inner: SqliteBackend::open_in_memory().unwrap(),
    });
    let executor = executor_for(backend.clone(), &scripts).build().unwrap();

    let result = executor.run();
    assert!(result.is_err());
    if let Err(e) = result {
        // first run, so the failed commit classifies as schema initialization
        assert_eq!(e.kind(), &ErrorKind::SchemaInitFailed);
    }

    // rolled back: nothing from the run is visible
    assert!(!table_exists(backend.as_ref(), "tb_user"));

    // the transaction was released, so a later one can begin on the same
    // connection
    backend.begin_transaction().unwrap();
    backend.rollback_transaction().unwrap();
}

#[test]
fn test_marker_monotonicity_across_runs() {
    let scripts = TempDir::new().unwrap();
    write_script(scripts.path(), "16061700", V1_SCRIPT);

    let backend: Arc<dyn SqlExecutor> = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let store = Arc::new(TableVersionStore::new(backend.clone()));

    executor_for(backend.clone(), &scripts)
        .build()
        .unwrap()
        .run()
        .unwrap();
    let first = store.get().unwrap().unwrap();

    write_script(scripts.path(), "16070100", V2_SCRIPT);
    executor_for(backend.clone(), &scripts)
        .build()
        .unwrap()
        .run()
        .unwrap();
    let second = store.get().unwrap().unwrap();

    assert!(second > first, "{} should follow {}", second, first);
}
