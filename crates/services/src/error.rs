//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{ExamConfigError, ExamResultError, OptionLabel};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by question supplies.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SupplyError {
    #[error("question generation is not configured")]
    Disabled,
    #[error("question generation returned an empty response")]
    EmptyResponse,
    #[error("question generation failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not parse generated questions: {0}")]
    Parse(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by exam sessions and the services around them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already finished")]
    Finished,
    #[error("no option selected")]
    NoSelection,
    #[error("option {0} does not belong to the current question")]
    UnknownOption(OptionLabel),
    #[error("{0} is not available in the current state")]
    NotAllowed(&'static str),
    #[error("question index {0} is not loaded")]
    MissingQuestion(usize),
    #[error(transparent)]
    Config(#[from] ExamConfigError),
    #[error(transparent)]
    Result(#[from] ExamResultError),
    #[error(transparent)]
    Supply(#[from] SupplyError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping exam services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
