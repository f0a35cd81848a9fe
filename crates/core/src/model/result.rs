use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::model::{AnswerRecord, ExamMode, Question, QuestionId, SessionId, SubjectProfile};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many answer records for a single exam: {len}")]
    TooManyRecords { len: usize },

    #[error("question {id} was answered more than once")]
    DuplicateRecord { id: QuestionId },

    #[error("answer for {id} has no matching question in the snapshot")]
    MissingQuestion { id: QuestionId },

    #[error("total ({total}) does not match correct ({correct}) plus unanswered ({unanswered})")]
    CountMismatch {
        total: u32,
        correct: u32,
        unanswered: u32,
    },

    #[error("unknown finish reason: {0}")]
    UnknownReason(String),
}

/// Why a scored exam ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Every available question was answered.
    Completed,
    /// The user finished before running out of questions.
    EndedByUser,
    /// The countdown reached zero.
    TimedOut,
}

impl FinishReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FinishReason::Completed => "completed",
            FinishReason::EndedByUser => "ended_by_user",
            FinishReason::TimedOut => "timed_out",
        }
    }

    /// # Errors
    ///
    /// Returns `ExamResultError::UnknownReason` for unrecognized values.
    pub fn parse(value: &str) -> Result<Self, ExamResultError> {
        match value {
            "completed" => Ok(Self::Completed),
            "ended_by_user" => Ok(Self::EndedByUser),
            "timed_out" => Ok(Self::TimedOut),
            other => Err(ExamResultError::UnknownReason(other.to_string())),
        }
    }
}

/// Correct/total tally for one competency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetencyScore {
    pub competency: String,
    pub total: u32,
    pub correct: u32,
}

impl CompetencyScore {
    #[must_use]
    pub fn percent(&self) -> f64 {
        percent(self.correct, self.total)
    }
}

pub(crate) fn percent(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(correct) * 100.0 / f64::from(total)
}

/// Scored snapshot of a finished exam: answers, the questions they refer to, and totals.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamResult {
    session_id: SessionId,
    mode: ExamMode,
    profile: SubjectProfile,
    target_count: u32,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    reason: FinishReason,
    total: u32,
    correct: u32,
    unanswered: u32,
    records: Vec<AnswerRecord>,
    questions: Vec<Question>,
}

/// Fields shared by every way of building an `ExamResult`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamResultMeta {
    pub session_id: SessionId,
    pub mode: ExamMode,
    pub profile: SubjectProfile,
    pub target_count: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub reason: FinishReason,
}

impl ExamResult {
    /// Score a finished exam from its answer records.
    ///
    /// `questions` must contain every question referenced by `records`; extra questions
    /// are dropped from the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ExamResultError` on an invalid time range, duplicate answers,
    /// or answers that reference unknown questions.
    pub fn from_records(
        meta: ExamResultMeta,
        questions: &[Question],
        records: Vec<AnswerRecord>,
    ) -> Result<Self, ExamResultError> {
        let total = u32::try_from(records.len())
            .map_err(|_| ExamResultError::TooManyRecords { len: records.len() })?;
        let mut correct = 0_u32;
        let mut unanswered = 0_u32;
        for record in &records {
            if record.is_correct {
                correct = correct.saturating_add(1);
            }
            if !record.is_answered() {
                unanswered = unanswered.saturating_add(1);
            }
        }

        let snapshot = records
            .iter()
            .map(|record| {
                questions
                    .iter()
                    .find(|q| q.id() == &record.question_id)
                    .cloned()
                    .ok_or_else(|| ExamResultError::MissingQuestion {
                        id: record.question_id.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_persisted(meta, total, correct, unanswered, records, snapshot)
    }

    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ExamResultError` if the stored totals disagree with the records.
    pub fn from_persisted(
        meta: ExamResultMeta,
        total: u32,
        correct: u32,
        unanswered: u32,
        records: Vec<AnswerRecord>,
        questions: Vec<Question>,
    ) -> Result<Self, ExamResultError> {
        if meta.completed_at < meta.started_at {
            return Err(ExamResultError::InvalidTimeRange);
        }
        if correct.saturating_add(unanswered) > total
            || usize::try_from(total).ok() != Some(records.len())
        {
            return Err(ExamResultError::CountMismatch {
                total,
                correct,
                unanswered,
            });
        }

        let mut seen = HashSet::new();
        for record in &records {
            if !seen.insert(record.question_id.clone()) {
                return Err(ExamResultError::DuplicateRecord {
                    id: record.question_id.clone(),
                });
            }
            if !questions.iter().any(|q| q.id() == &record.question_id) {
                return Err(ExamResultError::MissingQuestion {
                    id: record.question_id.clone(),
                });
            }
        }

        Ok(Self {
            session_id: meta.session_id,
            mode: meta.mode,
            profile: meta.profile,
            target_count: meta.target_count,
            started_at: meta.started_at,
            completed_at: meta.completed_at,
            reason: meta.reason,
            total,
            correct,
            unanswered,
            records,
            questions,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn mode(&self) -> ExamMode {
        self.mode
    }

    #[must_use]
    pub fn profile(&self) -> &SubjectProfile {
        &self.profile
    }

    #[must_use]
    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn reason(&self) -> FinishReason {
        self.reason
    }

    /// Number of questions the user reached (answered or left pending at timeout).
    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn unanswered(&self) -> u32 {
        self.unanswered
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.total - self.correct - self.unanswered
    }

    #[must_use]
    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Correct answers as a percentage of reached questions.
    #[must_use]
    pub fn score_percent(&self) -> f64 {
        percent(self.correct, self.total)
    }

    /// Per-competency tallies, sorted by competency name.
    #[must_use]
    pub fn competency_breakdown(&self) -> Vec<CompetencyScore> {
        let mut by_competency: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
        for record in &self.records {
            let Some(question) = self.questions.iter().find(|q| q.id() == &record.question_id)
            else {
                continue;
            };
            let entry = by_competency.entry(question.competency()).or_default();
            entry.0 = entry.0.saturating_add(1);
            if record.is_correct {
                entry.1 = entry.1.saturating_add(1);
            }
        }

        by_competency
            .into_iter()
            .map(|(competency, (total, correct))| CompetencyScore {
                competency: competency.to_string(),
                total,
                correct,
            })
            .collect()
    }
}
