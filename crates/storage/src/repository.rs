use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{ExamResult, Question, SubjectProfile};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted exam result with its storage id.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamResultRow {
    pub id: i64,
    pub result: ExamResult,
}

impl ExamResultRow {
    #[must_use]
    pub fn new(id: i64, result: ExamResult) -> Self {
        Self { id, result }
    }
}

/// Narrowing for result listings. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFilter {
    pub role: Option<String>,
    pub area: Option<String>,
    pub completed_from: Option<DateTime<Utc>>,
    pub completed_until: Option<DateTime<Utc>>,
}

impl ResultFilter {
    #[must_use]
    pub fn for_profile(profile: &SubjectProfile) -> Self {
        Self {
            role: Some(profile.role().to_string()),
            area: Some(profile.area().to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn completed_between(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.completed_from = from;
        self.completed_until = until;
        self
    }

    #[must_use]
    pub fn matches(&self, result: &ExamResult) -> bool {
        let profile = result.profile();
        self.role.as_deref().is_none_or(|r| r == profile.role())
            && self.area.as_deref().is_none_or(|a| a == profile.area())
            && self
                .completed_from
                .is_none_or(|from| result.completed_at() >= from)
            && self
                .completed_until
                .is_none_or(|until| result.completed_at() <= until)
    }
}

/// Sink for scored exam snapshots.
#[async_trait]
pub trait ExamResultRepository: Send + Sync {
    /// Persist a finished exam and return its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a result for the same session already exists,
    /// or other storage errors.
    async fn append_result(&self, result: &ExamResult) -> Result<i64, StorageError>;

    /// Fetch a result by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: i64) -> Result<ExamResult, StorageError>;

    /// List results matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query or row mapping fails.
    async fn list_result_rows(
        &self,
        filter: &ResultFilter,
        limit: u32,
    ) -> Result<Vec<ExamResultRow>, StorageError>;
}

/// Local store of previously generated or seeded questions, scoped by profile.
#[async_trait]
pub trait QuestionBankRepository: Send + Sync {
    /// Insert or replace questions for a profile's role and area.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the questions cannot be stored.
    async fn upsert_questions(
        &self,
        profile: &SubjectProfile,
        questions: &[Question],
    ) -> Result<usize, StorageError>;

    /// List questions for a profile in insertion order. A profile competency narrows the
    /// listing to that competency.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query or row mapping fails.
    async fn list_questions(
        &self,
        profile: &SubjectProfile,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError>;

    /// Count questions available for a profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn count_questions(&self, profile: &SubjectProfile) -> Result<u64, StorageError>;
}

#[derive(Debug, Clone)]
struct BankEntry {
    role: String,
    area: String,
    question: Question,
}

impl BankEntry {
    fn matches(&self, profile: &SubjectProfile) -> bool {
        self.role == profile.role()
            && self.area == profile.area()
            && profile
                .competency()
                .is_none_or(|c| c == self.question.competency())
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<Vec<ExamResultRow>>>,
    bank: Arc<Mutex<Vec<BankEntry>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExamResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &ExamResult) -> Result<i64, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard
            .iter()
            .any(|row| row.result.session_id() == result.session_id())
        {
            return Err(StorageError::Conflict);
        }
        let id = guard.last().map_or(1, |row| row.id + 1);
        guard.push(ExamResultRow::new(id, result.clone()));
        Ok(id)
    }

    async fn get_result(&self, id: i64) -> Result<ExamResult, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.result.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_result_rows(
        &self,
        filter: &ResultFilter,
        limit: u32,
    ) -> Result<Vec<ExamResultRow>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<ExamResultRow> = guard
            .iter()
            .filter(|row| filter.matches(&row.result))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.result
                .completed_at()
                .cmp(&a.result.completed_at())
                .then_with(|| b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

#[async_trait]
impl QuestionBankRepository for InMemoryRepository {
    async fn upsert_questions(
        &self,
        profile: &SubjectProfile,
        questions: &[Question],
    ) -> Result<usize, StorageError> {
        let mut guard = self
            .bank
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for question in questions {
            let existing = guard.iter_mut().find(|entry| {
                entry.role == profile.role()
                    && entry.area == profile.area()
                    && entry.question.id() == question.id()
            });
            match existing {
                Some(entry) => entry.question = question.clone(),
                None => guard.push(BankEntry {
                    role: profile.role().to_string(),
                    area: profile.area().to_string(),
                    question: question.clone(),
                }),
            }
        }
        Ok(questions.len())
    }

    async fn list_questions(
        &self,
        profile: &SubjectProfile,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .bank
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|entry| entry.matches(profile))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|entry| entry.question.clone())
            .collect())
    }

    async fn count_questions(&self, profile: &SubjectProfile) -> Result<u64, StorageError> {
        let guard = self
            .bank
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let count = guard.iter().filter(|entry| entry.matches(profile)).count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }
}

/// Aggregates result and question-bank repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub results: Arc<dyn ExamResultRepository>,
    pub bank: Arc<dyn QuestionBankRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let results: Arc<dyn ExamResultRepository> = Arc::new(repo.clone());
        let bank: Arc<dyn QuestionBankRepository> = Arc::new(repo);
        Self { results, bank }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{
        AnswerRecord, ExamMode, ExamResultMeta, FinishReason, OptionLabel, QuestionDraft,
        QuestionOption, SessionId,
    };
    use exam_core::time::fixed_now;

    fn question(id: &str, competency: &str) -> Question {
        QuestionDraft {
            id: id.into(),
            prompt: format!("Pregunta {id}"),
            context: None,
            options: vec![
                QuestionOption {
                    label: OptionLabel::new("A").unwrap(),
                    text: "uno".into(),
                },
                QuestionOption {
                    label: OptionLabel::new("B").unwrap(),
                    text: "dos".into(),
                },
            ],
            correct: "A".into(),
            competency: competency.into(),
            difficulty: Default::default(),
            reference: Default::default(),
        }
        .validate()
        .unwrap()
    }

    fn profile() -> SubjectProfile {
        SubjectProfile::new("Docente de aula", "Matemáticas").unwrap()
    }

    fn result(completed_offset_days: i64) -> ExamResult {
        let q = question("q1", "Pedagógica");
        let now = fixed_now();
        ExamResult::from_records(
            ExamResultMeta {
                session_id: SessionId::generate(),
                mode: ExamMode::Quick,
                profile: profile(),
                target_count: 1,
                started_at: now - chrono::Duration::days(30),
                completed_at: now + chrono::Duration::days(completed_offset_days),
                reason: FinishReason::Completed,
            },
            std::slice::from_ref(&q),
            vec![AnswerRecord::answered(&q, OptionLabel::new("A").unwrap(), 4)],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn results_list_newest_first_and_reject_duplicates() {
        let repo = InMemoryRepository::new();
        let older = result(-2);
        let newer = result(-1);

        let older_id = repo.append_result(&older).await.unwrap();
        let newer_id = repo.append_result(&newer).await.unwrap();
        assert!(matches!(
            repo.append_result(&older).await,
            Err(StorageError::Conflict)
        ));

        let rows = repo
            .list_result_rows(&ResultFilter::for_profile(&profile()), 10)
            .await
            .unwrap();
        assert_eq!(
            rows.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![newer_id, older_id]
        );
        assert_eq!(repo.get_result(older_id).await.unwrap(), older);
    }

    #[tokio::test]
    async fn bank_filters_by_profile_and_competency() {
        let repo = InMemoryRepository::new();
        let p = profile();
        repo.upsert_questions(
            &p,
            &[question("q1", "Pedagógica"), question("q2", "Disciplinar")],
        )
        .await
        .unwrap();
        repo.upsert_questions(&p, &[question("q1", "Pedagógica")])
            .await
            .unwrap();

        assert_eq!(repo.count_questions(&p).await.unwrap(), 2);

        let narrowed = p.clone().with_competency(Some("Disciplinar".into()));
        let listed = repo.list_questions(&narrowed, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id().as_str(), "q2");

        let other = SubjectProfile::new("Directivo docente", "Gestión").unwrap();
        assert_eq!(repo.count_questions(&other).await.unwrap(), 0);
    }
}
