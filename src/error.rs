use chrono::NaiveDate;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("progress {0} is outside 0-100")]
    OutOfRange(i32),

    #[error("dependency {predecessor} -> {successor} already exists")]
    DuplicateEdge { predecessor: i64, successor: i64 },

    #[error("task {0} cannot depend on itself")]
    SelfDependency(i64),

    #[error("adding {predecessor} -> {successor} would create a cycle")]
    CycleDetected { predecessor: i64, successor: i64 },

    #[error("task {parent} is task {task} or one of its descendants")]
    ParentCycle { task: i64, parent: i64 },

    #[error("parent task belongs to project {parent_project}, not {task_project}")]
    CrossProjectParent {
        task_project: i64,
        parent_project: i64,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] rusqlite::Error),

    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Transient storage failures are the only kind a caller may retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Error::ConstraintViolation(err.to_string()),
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
                | ErrorCode::CannotOpen
                | ErrorCode::OutOfMemory
                | ErrorCode::FileLockingProtocolFailed
                | ErrorCode::ReadOnly,
            ) => Error::StorageUnavailable(err),
            _ => Error::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
