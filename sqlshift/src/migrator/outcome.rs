use crate::errors::SqlShiftError;
use crate::version_store::VersionMarker;

/// Terminal result of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MigrationStatus {
    Succeeded,
    Failed,
}

/// What a migration run produced, surfaced to the completion hook and then
/// discarded; durable logging is the host's responsibility.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    status: MigrationStatus,
    from_version: Option<VersionMarker>,
    to_version: Option<VersionMarker>,
    applied: bool,
    error: Option<SqlShiftError>,
}

impl MigrationOutcome {
    pub(crate) fn succeeded(
        from_version: Option<VersionMarker>,
        to_version: VersionMarker,
    ) -> Self {
        MigrationOutcome {
            status: MigrationStatus::Succeeded,
            from_version,
            to_version: Some(to_version),
            applied: true,
            error: None,
        }
    }

    /// A run where the marker was already at the latest version.
    pub(crate) fn noop(version: VersionMarker) -> Self {
        MigrationOutcome {
            status: MigrationStatus::Succeeded,
            from_version: Some(version.clone()),
            to_version: Some(version),
            applied: false,
            error: None,
        }
    }

    pub(crate) fn failed(from_version: Option<VersionMarker>, error: SqlShiftError) -> Self {
        MigrationOutcome {
            status: MigrationStatus::Failed,
            from_version,
            to_version: None,
            applied: false,
            error: Some(error),
        }
    }

    pub fn status(&self) -> MigrationStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == MigrationStatus::Succeeded
    }

    /// The marker before the run, `None` on a first run.
    pub fn from_version(&self) -> Option<&str> {
        self.from_version.as_deref()
    }

    /// The marker after the run, `None` when the run failed before resolving it.
    pub fn to_version(&self) -> Option<&str> {
        self.to_version.as_deref()
    }

    /// False when the schema was already current and nothing was applied.
    pub fn applied(&self) -> bool {
        self.applied
    }

    pub fn error(&self) -> Option<&SqlShiftError> {
        self.error.as_ref()
    }
}
