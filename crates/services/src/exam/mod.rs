mod history;
mod loader;
mod progress;
mod questions;
mod session;
mod view;
mod workflow;

// Public API of the exam subsystem.
pub use crate::error::SessionError;
pub use history::{ExamHistoryService, ExamResultListItem};
pub use loader::{
    FAILURE_BUDGET, LoaderHandle, LoaderPlan, LoaderReport, LoaderStatus, LoaderStop,
    LoaderTiming, ProgressiveLoader,
};
pub use progress::ExamProgress;
pub use questions::SharedQuestions;
pub use session::{ExamSession, SessionEnd, SessionEvent, SessionState};
pub use view::{AnswerFeedback, SessionPhase, SessionView};
pub use workflow::{ExamLoopService, ExamRun, ExamStep};
