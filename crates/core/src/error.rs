use thiserror::Error;

use crate::model::{ExamConfigError, ExamResultError, ProfileError, QuestionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Config(#[from] ExamConfigError),
    #[error(transparent)]
    Result(#[from] ExamResultError),
}
