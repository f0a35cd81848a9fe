#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    ExamResultRepository, ExamResultRow, InMemoryRepository, QuestionBankRepository,
    ResultFilter, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
