//! Migration execution.
//!
//! The executor drives the end-to-end sequence for one migration run:
//! load the last version marker, load the current snapshot, diff, apply DDL
//! in dependency-safe order inside one transaction, persist the new marker.
//!
//! # States
//!
//! `Idle -> Preparing -> Diffing -> Applying -> Completing -> {Succeeded, Failed}`
//!
//! # Lifecycle hooks
//!
//! Three host hooks are invoked synchronously, in order:
//! - `prepare` (optional): supplies the last version marker from host-owned
//!   storage, overriding the default version-store lookup
//! - `execute` (optional): replaces the default DDL application wholesale,
//!   enabling custom data-transformation migrations
//! - `complete` (required): receives the [`MigrationOutcome`]; absence is a
//!   configuration error
//!
//! # Atomicity
//!
//! All DDL for one run executes inside a single transaction. On any statement
//! failure the transaction rolls back and the version marker stays at its
//! pre-run value; the run is re-attempted only on the next process start.

mod builder;
mod executor;
mod hooks;
mod outcome;

pub use builder::MigratorBuilder;
pub use executor::{plan_ddl, MigrationExecutor, MigrationState};
pub use hooks::{ApplyContext, CompleteHook, ExecuteHook, MigrationHooks, PrepareHook};
pub use outcome::{MigrationOutcome, MigrationStatus};
