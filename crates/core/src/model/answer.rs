use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;
use crate::model::question::{OptionLabel, Question};

/// Record of one committed (or timed-out) answer.
///
/// Created once per question and never edited. The order of records in a session is
/// the order in which questions were visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    /// `None` when the question was left unanswered at timeout.
    pub chosen: Option<OptionLabel>,
    pub is_correct: bool,
    pub elapsed_secs: u32,
}

impl AnswerRecord {
    #[must_use]
    pub fn answered(question: &Question, chosen: OptionLabel, elapsed_secs: u32) -> Self {
        Self {
            question_id: question.id().clone(),
            is_correct: question.is_correct(&chosen),
            chosen: Some(chosen),
            elapsed_secs,
        }
    }

    #[must_use]
    pub fn unanswered(question_id: QuestionId, elapsed_secs: u32) -> Self {
        Self {
            question_id,
            chosen: None,
            is_correct: false,
            elapsed_secs,
        }
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.chosen.is_some()
    }
}
