//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AttemptError, AttemptId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by quiz session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already completed")]
    Completed,
    #[error("question {question_id} has no option {option_id}")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },
    #[error("attempt {0} belongs to a different user")]
    ForeignAttempt(AttemptId),
    #[error("attempt progress ({answered}) does not fit a bank of {total} questions")]
    ProgressOutOfRange { answered: usize, total: usize },
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AttemptHistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `UserIdentityService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}
