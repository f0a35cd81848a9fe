#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod exam;
pub mod supply;

#[cfg(test)]
pub(crate) mod testing;

pub use exam_core::Clock;

pub use app_services::{ExamServices, SupplyKind};
pub use config::ServicesConfig;
pub use error::{ExamServicesError, SessionError, SupplyError};
pub use exam::{
    ExamHistoryService, ExamLoopService, ExamRun, ExamSession, ExamStep, SessionEvent,
    SessionState, SessionView,
};
pub use supply::{AiQuestionSupply, BankQuestionSupply, FetchRequest, QuestionSupply};
