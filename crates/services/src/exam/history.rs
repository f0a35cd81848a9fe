use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use exam_core::model::{CompetencyScore, ExamMode, ExamResult, FinishReason, SubjectProfile};
use storage::repository::{ExamResultRepository, ExamResultRow, ResultFilter};

use crate::Clock;
use crate::error::SessionError;

/// Presentation-agnostic list item for a stored exam result.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamResultListItem {
    pub id: i64,
    pub completed_at: DateTime<Utc>,
    pub mode: ExamMode,
    pub reason: FinishReason,
    pub total: u32,
    pub correct: u32,
    pub unanswered: u32,
    pub score_percent: f64,
}

impl ExamResultListItem {
    #[must_use]
    pub fn from_row(row: &ExamResultRow) -> Self {
        let result = &row.result;
        Self {
            id: row.id,
            completed_at: result.completed_at(),
            mode: result.mode(),
            reason: result.reason(),
            total: result.total(),
            correct: result.correct(),
            unanswered: result.unanswered(),
            score_percent: result.score_percent(),
        }
    }
}

/// Read side over stored results: recent attempts and per-competency trends.
#[derive(Clone)]
pub struct ExamHistoryService {
    clock: Clock,
    results: Arc<dyn ExamResultRepository>,
}

impl ExamHistoryService {
    #[must_use]
    pub fn new(clock: Clock, results: Arc<dyn ExamResultRepository>) -> Self {
        Self { clock, results }
    }

    fn recent_filter(&self, profile: &SubjectProfile, days: u32) -> ResultFilter {
        let since = self.clock.now() - Duration::days(i64::from(days));
        ResultFilter::for_profile(profile).completed_between(Some(since), None)
    }

    /// Results for a profile completed within the last `days`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent(
        &self,
        profile: &SubjectProfile,
        days: u32,
        limit: u32,
    ) -> Result<Vec<ExamResultListItem>, SessionError> {
        let rows = self
            .results
            .list_result_rows(&self.recent_filter(profile, days), limit)
            .await?;
        Ok(rows.iter().map(ExamResultListItem::from_row).collect())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the result is missing or cannot be loaded.
    pub async fn get_result(&self, id: i64) -> Result<ExamResult, SessionError> {
        Ok(self.results.get_result(id).await?)
    }

    /// Per-competency totals summed over the recent results, sorted by competency.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn competency_trends(
        &self,
        profile: &SubjectProfile,
        days: u32,
        limit: u32,
    ) -> Result<Vec<CompetencyScore>, SessionError> {
        let rows = self
            .results
            .list_result_rows(&self.recent_filter(profile, days), limit)
            .await?;

        let mut totals: BTreeMap<String, (u32, u32)> = BTreeMap::new();
        for row in &rows {
            for score in row.result.competency_breakdown() {
                let entry = totals.entry(score.competency).or_default();
                entry.0 = entry.0.saturating_add(score.total);
                entry.1 = entry.1.saturating_add(score.correct);
            }
        }

        Ok(totals
            .into_iter()
            .map(|(competency, (total, correct))| CompetencyScore {
                competency,
                total,
                correct,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{profile, question};
    use exam_core::model::{AnswerRecord, ExamResultMeta, OptionLabel, Question, SessionId};
    use exam_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn result(days_ago: i64, answers: &[(&Question, &str)]) -> ExamResult {
        let questions: Vec<Question> = answers.iter().map(|(q, _)| (*q).clone()).collect();
        let records = answers
            .iter()
            .map(|(q, label)| AnswerRecord::answered(q, OptionLabel::new(*label).unwrap(), 10))
            .collect();
        let completed_at = fixed_now() - Duration::days(days_ago);
        ExamResult::from_records(
            ExamResultMeta {
                session_id: SessionId::generate(),
                mode: ExamMode::Quick,
                profile: profile(),
                target_count: 10,
                started_at: completed_at - Duration::minutes(15),
                completed_at,
                reason: FinishReason::Completed,
            },
            &questions,
            records,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn recent_results_and_trends_respect_the_window() {
        let repo = Arc::new(InMemoryRepository::new());
        let q1 = question("q1");
        let q2 = crate::testing::question_in("q2", "Disciplinar");

        repo.append_result(&result(1, &[(&q1, "A"), (&q2, "B")]))
            .await
            .unwrap();
        let newest = repo
            .append_result(&result(0, &[(&q1, "B")]))
            .await
            .unwrap();
        repo.append_result(&result(40, &[(&q1, "A")])).await.unwrap();

        let service = ExamHistoryService::new(fixed_clock(), repo);
        let recent = service.list_recent(&profile(), 7, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, newest);
        assert_eq!(recent[0].correct, 0);

        let trends = service.competency_trends(&profile(), 7, 10).await.unwrap();
        assert_eq!(
            trends,
            vec![
                CompetencyScore {
                    competency: "Disciplinar".into(),
                    total: 1,
                    correct: 0,
                },
                CompetencyScore {
                    competency: "Pedagógica".into(),
                    total: 2,
                    correct: 1,
                },
            ]
        );

        let fetched = service.get_result(newest).await.unwrap();
        assert_eq!(fetched.total(), 1);
    }
}
