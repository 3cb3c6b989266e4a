use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for sqlshift operations
///
/// Each kind describes a specific category of migration failure, enabling
/// precise error handling by the host application.
///
/// # Examples
///
/// ```rust,ignore
/// use sqlshift::errors::{SqlShiftError, ErrorKind, SqlShiftResult};
///
/// fn example() -> SqlShiftResult<()> {
///     Err(SqlShiftError::new("script not found", ErrorKind::ResourceNotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Configuration Errors - detected before any DDL runs
    /// Required completion hook not implemented
    DelegateMissing,
    /// Invalid configuration or input value
    ValidationError,

    // Script Resolution Errors - actively used by the script repository
    /// Migration script resource or directory missing
    ResourceNotFound,
    /// Migration script is empty or unparsable
    EmptyOrInvalidScript,
    /// A version marker is recorded but no corresponding script exists
    VersionMarkerInconsistent,

    // Diff Errors
    /// Snapshot handed to the differ is malformed
    InvalidSnapshot,

    // Apply Errors - trigger full rollback of the run's transaction
    /// First-time schema creation failed
    SchemaInitFailed,
    /// A DDL statement failed during the apply phase
    DdlApplicationFailed,
    /// New version marker could not be written after a successful apply
    VersionPersistFailed,

    // Execution Errors
    /// A migration run is already in flight
    MigrationInProgress,
    /// Error from the SQL execution backend
    BackendError,

    // IO Errors - actively used in script file access
    /// Generic IO error
    IOError,
    /// The file was not found
    FileNotFound,
    /// Permission denied for file operation
    PermissionDenied,

    // Generic/Internal Errors - used as fallback
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::DelegateMissing => write!(f, "Delegate missing"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::ResourceNotFound => write!(f, "Resource not found"),
            ErrorKind::EmptyOrInvalidScript => write!(f, "Empty or invalid script"),
            ErrorKind::VersionMarkerInconsistent => write!(f, "Version marker inconsistent"),
            ErrorKind::InvalidSnapshot => write!(f, "Invalid snapshot"),
            ErrorKind::SchemaInitFailed => write!(f, "Schema initialization failed"),
            ErrorKind::DdlApplicationFailed => write!(f, "DDL application failed"),
            ErrorKind::VersionPersistFailed => write!(f, "Version persist failed"),
            ErrorKind::MigrationInProgress => write!(f, "Migration in progress"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::FileNotFound => write!(f, "File not found"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom sqlshift error type.
///
/// `SqlShiftError` encapsulates the error message, kind, and optional cause.
/// It supports error chaining and backtraces for debugging.
///
/// # Type alias
///
/// The `SqlShiftResult<T>` type alias is equivalent to `Result<T, SqlShiftError>`
/// and is used throughout the codebase for operations that can fail.
#[derive(Clone)]
pub struct SqlShiftError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<SqlShiftError>>,
    backtrace: Atomic<Backtrace>,
}

impl SqlShiftError {
    /// Creates a new `SqlShiftError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        SqlShiftError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `SqlShiftError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: SqlShiftError) -> Self {
        SqlShiftError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&Box<SqlShiftError>> {
        self.cause.as_ref()
    }
}

impl Display for SqlShiftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for SqlShiftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for SqlShiftError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for sqlshift operations.
///
/// `SqlShiftResult<T>` is shorthand for `Result<T, SqlShiftError>`.
/// All fallible sqlshift operations return this type.
pub type SqlShiftResult<T> = Result<T, SqlShiftError>;

// From trait implementations for automatic error conversion
impl From<std::io::Error> for SqlShiftError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IOError,
        };
        SqlShiftError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<rusqlite::Error> for SqlShiftError {
    fn from(err: rusqlite::Error) -> Self {
        SqlShiftError::new(&format!("SQLite error: {}", err), ErrorKind::BackendError)
    }
}

impl From<String> for SqlShiftError {
    fn from(msg: String) -> Self {
        SqlShiftError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for SqlShiftError {
    fn from(msg: &str) -> Self {
        SqlShiftError::new(msg, ErrorKind::InternalError)
    }
}
