mod answer;
mod exam;
mod ids;
mod profile;
mod question;
mod result;

pub use ids::{ParseIdError, QuestionId, SessionId};

pub use answer::AnswerRecord;
pub use exam::{
    DEFAULT_CHUNK_SIZE, DEFAULT_INITIAL_BATCH_SIZE, ExamConfig, ExamConfigError, ExamMode,
};
pub use profile::{ProfileError, SubjectProfile};
pub use question::{
    Difficulty, NormativeReference, OptionLabel, Question, QuestionDraft, QuestionError,
    QuestionOption,
};
pub use result::{CompetencyScore, ExamResult, ExamResultError, ExamResultMeta, FinishReason};
