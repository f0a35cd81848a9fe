use chrono::{DateTime, Utc};
use exam_core::model::{
    AnswerRecord, ExamConfig, ExamResult, ExamResultMeta, FinishReason, OptionLabel, Question,
    QuestionId, SessionId, SubjectProfile,
};
use exam_core::time::elapsed_secs;

use super::loader::LoaderStatus;
use super::progress::ExamProgress;
use super::questions::SharedQuestions;
use super::view::SessionView;
use crate::error::SessionError;

//
// ─── STATES & EVENTS ───────────────────────────────────────────────────────────
//

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Completed,
    EndedByUser,
    /// Countdown reached zero. `pending` is the question on screen that was never committed.
    TimedOut { pending: Option<QuestionId> },
    Abandoned,
}

impl SessionEnd {
    /// Reason to persist, or `None` when the session must not be scored.
    #[must_use]
    pub fn reason(&self) -> Option<FinishReason> {
        match self {
            SessionEnd::Completed => Some(FinishReason::Completed),
            SessionEnd::EndedByUser => Some(FinishReason::EndedByUser),
            SessionEnd::TimedOut { .. } => Some(FinishReason::TimedOut),
            SessionEnd::Abandoned => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Presenting { index: usize },
    /// Practice only: the answer for `index` was committed and its feedback is on screen.
    Feedback { index: usize },
    /// `index` was the last loaded question and more are still expected.
    AwaitingMore { index: usize },
    Finished(SessionEnd),
}

impl SessionState {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionState::Finished(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Select(OptionLabel),
    Commit,
    Next,
    /// One second of countdown.
    Tick,
    Finish,
    Abandon,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State machine for one exam attempt.
///
/// Every user action and countdown tick goes through [`ExamSession::apply`]. The question
/// collection may grow underneath the session; growth alone never changes the state.
#[derive(Debug)]
pub struct ExamSession {
    id: SessionId,
    config: ExamConfig,
    profile: SubjectProfile,
    questions: SharedQuestions,
    loader: LoaderStatus,
    state: SessionState,
    selected: Option<OptionLabel>,
    records: Vec<AnswerRecord>,
    remaining_secs: Option<u32>,
    started_at: DateTime<Utc>,
    question_started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    result_id: Option<i64>,
}

impl ExamSession {
    /// Start at the first loaded question with the full time budget.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are loaded.
    pub fn start(
        id: SessionId,
        config: ExamConfig,
        profile: SubjectProfile,
        questions: SharedQuestions,
        loader: LoaderStatus,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            id,
            remaining_secs: config.time_budget_secs(),
            config,
            profile,
            questions,
            loader,
            state: SessionState::Presenting { index: 0 },
            selected: None,
            records: Vec::new(),
            started_at,
            question_started_at: started_at,
            completed_at: None,
            result_id: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    #[must_use]
    pub fn profile(&self) -> &SubjectProfile {
        &self.profile
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn selected(&self) -> Option<&OptionLabel> {
        self.selected.as_ref()
    }

    /// Committed answers in visit order.
    #[must_use]
    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.remaining_secs
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn result_id(&self) -> Option<i64> {
        self.result_id
    }

    pub(crate) fn set_result_id(&mut self, id: i64) {
        self.result_id = Some(id);
    }

    #[must_use]
    pub fn questions(&self) -> &SharedQuestions {
        &self.questions
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    #[must_use]
    pub fn loader_active(&self) -> bool {
        self.loader.is_active()
    }

    /// Question the user is looking at, if the state shows one.
    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        match self.state {
            SessionState::Presenting { index } | SessionState::Feedback { index } => {
                self.questions.get(index)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_correct).count()
    }

    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        let position = match self.state {
            SessionState::Presenting { index }
            | SessionState::Feedback { index }
            | SessionState::AwaitingMore { index } => index + 1,
            SessionState::Finished(_) => self.records.len(),
        };
        ExamProgress {
            position,
            available: self.questions.len(),
            target: usize::try_from(self.config.target_count()).unwrap_or(usize::MAX),
            answered: self.records.len(),
            correct: self.correct_count(),
            loading: self.loader.is_active(),
        }
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView::of(self)
    }

    /// Apply one event and return the resulting state.
    ///
    /// Ticks are ignored in untimed modes and after the session has finished.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` for any non-tick event after the session ended,
    /// `SessionError::NoSelection` when committing without a selection,
    /// `SessionError::UnknownOption` when selecting a label the question does not have,
    /// and `SessionError::NotAllowed` for events the current state does not accept.
    /// A rejected event leaves the session unchanged.
    pub fn apply(
        &mut self,
        event: SessionEvent,
        now: DateTime<Utc>,
    ) -> Result<SessionState, SessionError> {
        if self.is_finished() {
            return match event {
                SessionEvent::Tick => Ok(self.state.clone()),
                _ => Err(SessionError::Finished),
            };
        }

        match (event, self.state.clone()) {
            (SessionEvent::Tick, _) => self.tick(now),
            (SessionEvent::Finish, _) => self.finish(SessionEnd::EndedByUser, now),
            (SessionEvent::Abandon, _) => self.finish(SessionEnd::Abandoned, now),
            (SessionEvent::Select(label), SessionState::Presenting { index }) => {
                let question = self.question_at(index)?;
                if !question.has_option(&label) {
                    return Err(SessionError::UnknownOption(label));
                }
                self.selected = Some(label);
            }
            (SessionEvent::Commit, SessionState::Presenting { index }) => {
                self.commit(index, now)?;
            }
            (
                SessionEvent::Next | SessionEvent::Commit,
                SessionState::Feedback { index } | SessionState::AwaitingMore { index },
            ) => self.advance_from(index, now),
            (SessionEvent::Select(_), _) => return Err(SessionError::NotAllowed("select")),
            (SessionEvent::Commit, _) => return Err(SessionError::NotAllowed("commit")),
            (SessionEvent::Next, _) => return Err(SessionError::NotAllowed("next")),
        }

        Ok(self.state.clone())
    }

    fn question_at(&self, index: usize) -> Result<Question, SessionError> {
        self.questions
            .get(index)
            .ok_or(SessionError::MissingQuestion(index))
    }

    fn commit(&mut self, index: usize, now: DateTime<Utc>) -> Result<(), SessionError> {
        let label = self.selected.clone().ok_or(SessionError::NoSelection)?;
        let question = self.question_at(index)?;
        let elapsed = elapsed_secs(self.question_started_at, now);
        self.records
            .push(AnswerRecord::answered(&question, label, elapsed));

        if self.config.mode().shows_feedback() {
            self.state = SessionState::Feedback { index };
        } else {
            self.advance_from(index, now);
        }
        Ok(())
    }

    fn advance_from(&mut self, index: usize, now: DateTime<Utc>) {
        let available = self.questions.len();
        let target = usize::try_from(self.config.target_count()).unwrap_or(usize::MAX);

        if index + 1 < available {
            self.state = SessionState::Presenting { index: index + 1 };
            self.selected = None;
            self.question_started_at = now;
        } else if available < target && self.loader.is_active() {
            self.state = SessionState::AwaitingMore { index };
        } else {
            self.finish(SessionEnd::Completed, now);
        }
    }

    fn tick(&mut self, now: DateTime<Utc>) {
        let Some(remaining) = self.remaining_secs.as_mut() else {
            return;
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return;
        }

        let pending = match self.state {
            SessionState::Presenting { index } => self.questions.get(index).map(|q| q.id().clone()),
            _ => None,
        };
        self.finish(SessionEnd::TimedOut { pending }, now);
    }

    fn finish(&mut self, end: SessionEnd, now: DateTime<Utc>) {
        tracing::info!(session = %self.id, ?end, answered = self.records.len(), "exam session finished");
        self.state = SessionState::Finished(end);
        self.completed_at = Some(now);
    }

    /// Score the finished session.
    ///
    /// A question pending at timeout is scored as unanswered. Abandoned sessions are not
    /// scored and yield `None`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAllowed` if the session is still running, or
    /// `SessionError::Result` if the snapshot fails validation.
    pub fn build_result(&self) -> Result<Option<ExamResult>, SessionError> {
        let (SessionState::Finished(end), Some(completed_at)) = (&self.state, self.completed_at)
        else {
            return Err(SessionError::NotAllowed("scoring"));
        };
        let Some(reason) = end.reason() else {
            return Ok(None);
        };

        let mut records = self.records.clone();
        if let SessionEnd::TimedOut {
            pending: Some(id),
        } = end
        {
            records.push(AnswerRecord::unanswered(
                id.clone(),
                elapsed_secs(self.question_started_at, completed_at),
            ));
        }

        // Questions are visited in collection order, so the answered ones form a prefix.
        let questions = self.questions.prefix(records.len());
        let meta = ExamResultMeta {
            session_id: self.id,
            mode: self.config.mode(),
            profile: self.profile.clone(),
            target_count: self.config.target_count(),
            started_at: self.started_at,
            completed_at,
            reason,
        };
        Ok(Some(ExamResult::from_records(meta, &questions, records)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{profile, question};
    use exam_core::model::ExamMode;
    use exam_core::time::fixed_now;
    use chrono::Duration;

    fn label(value: &str) -> OptionLabel {
        OptionLabel::new(value).unwrap()
    }

    fn session(config: ExamConfig, ids: &[&str], loader: LoaderStatus) -> ExamSession {
        let questions = SharedQuestions::from_batch(ids.iter().map(|id| question(id)).collect(), 100);
        ExamSession::start(SessionId::generate(), config, profile(), questions, loader, fixed_now())
            .unwrap()
    }

    fn timed(target: u32, budget: u32) -> ExamConfig {
        ExamConfig::new(ExamMode::Quick, target, 3, 5, Some(budget)).unwrap()
    }

    fn answer(session: &mut ExamSession, choice: &str) -> SessionState {
        session.apply(SessionEvent::Select(label(choice)), fixed_now()).unwrap();
        session.apply(SessionEvent::Commit, fixed_now()).unwrap()
    }

    #[test]
    fn empty_collection_cannot_start() {
        let err = ExamSession::start(
            SessionId::generate(),
            ExamConfig::for_mode(ExamMode::Practice),
            profile(),
            SharedQuestions::new(),
            LoaderStatus::finished(),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[test]
    fn timed_commit_advances_by_exactly_one() {
        let mut s = session(timed(3, 300), &["q1", "q2", "q3"], LoaderStatus::finished());

        assert_eq!(answer(&mut s, "A"), SessionState::Presenting { index: 1 });
        assert_eq!(answer(&mut s, "B"), SessionState::Presenting { index: 2 });
        assert_eq!(
            answer(&mut s, "A"),
            SessionState::Finished(SessionEnd::Completed)
        );
        assert_eq!(s.records().len(), 3);
        assert_eq!(s.correct_count(), 2);
        assert!(s.selected().is_none());
    }

    #[test]
    fn commit_without_selection_is_rejected_and_keeps_state() {
        let mut s = session(timed(2, 300), &["q1", "q2"], LoaderStatus::finished());

        let err = s.apply(SessionEvent::Commit, fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::NoSelection));
        assert_eq!(s.state(), &SessionState::Presenting { index: 0 });
        assert!(s.records().is_empty());
    }

    #[test]
    fn unknown_option_is_rejected() {
        let mut s = session(timed(2, 300), &["q1", "q2"], LoaderStatus::finished());
        let err = s
            .apply(SessionEvent::Select(label("E")), fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownOption(_)));
        assert!(s.selected().is_none());
    }

    #[test]
    fn practice_shows_feedback_and_records_each_question_once() {
        let mut s = session(
            ExamConfig::for_mode(ExamMode::Practice).with_target_count(2).unwrap(),
            &["q1", "q2"],
            LoaderStatus::finished(),
        );

        assert_eq!(answer(&mut s, "B"), SessionState::Feedback { index: 0 });
        let view = s.view();
        assert!(view.can_next);
        assert!(!view.can_commit);
        let feedback = view.feedback.unwrap();
        assert!(!feedback.is_correct);
        assert_eq!(feedback.correct.as_str(), "A");

        // a second commit on feedback behaves like next and does not record again
        assert_eq!(
            s.apply(SessionEvent::Commit, fixed_now()).unwrap(),
            SessionState::Presenting { index: 1 }
        );
        assert_eq!(s.records().len(), 1);
        assert!(matches!(
            s.apply(SessionEvent::Next, fixed_now()),
            Err(SessionError::NotAllowed("next"))
        ));
    }

    #[test]
    fn practice_never_times_out() {
        let mut s = session(
            ExamConfig::for_mode(ExamMode::Practice),
            &["q1"],
            LoaderStatus::finished(),
        );
        for _ in 0..10_000 {
            s.apply(SessionEvent::Tick, fixed_now()).unwrap();
        }
        assert_eq!(s.state(), &SessionState::Presenting { index: 0 });
        assert_eq!(s.remaining_secs(), None);
    }

    #[test]
    fn timeout_fires_at_exactly_budget_ticks() {
        let mut s = session(timed(3, 5), &["q1", "q2", "q3"], LoaderStatus::finished());

        for _ in 0..4 {
            s.apply(SessionEvent::Tick, fixed_now()).unwrap();
            assert!(!s.is_finished());
        }
        let state = s
            .apply(SessionEvent::Tick, fixed_now() + Duration::seconds(5))
            .unwrap();

        let pending = QuestionId::new("q1").unwrap();
        assert_eq!(
            state,
            SessionState::Finished(SessionEnd::TimedOut {
                pending: Some(pending.clone())
            })
        );
        assert!(s.records().is_empty());

        let result = s.build_result().unwrap().unwrap();
        assert_eq!(result.reason(), FinishReason::TimedOut);
        assert_eq!(result.total(), 1);
        assert_eq!(result.unanswered(), 1);
        assert_eq!(result.correct(), 0);
        assert_eq!(result.records()[0].question_id, pending);
        assert_eq!(result.records()[0].elapsed_secs, 5);
    }

    #[test]
    fn timeout_keeps_committed_answers_only() {
        let mut s = session(timed(3, 2), &["q1", "q2", "q3"], LoaderStatus::finished());
        answer(&mut s, "A");
        s.apply(SessionEvent::Select(label("A")), fixed_now()).unwrap();
        s.apply(SessionEvent::Tick, fixed_now()).unwrap();
        s.apply(SessionEvent::Tick, fixed_now()).unwrap();

        assert!(s.is_finished());
        assert_eq!(s.records().len(), 1);
        let result = s.build_result().unwrap().unwrap();
        assert_eq!(result.total(), 2);
        assert_eq!(result.correct(), 1);
        assert_eq!(result.unanswered(), 1);
        assert_eq!(result.questions().len(), 2);
    }

    #[test]
    fn timeout_while_awaiting_more_has_no_pending_question() {
        let mut s = session(timed(3, 2), &["q1"], LoaderStatus::pinned_active());
        assert_eq!(answer(&mut s, "A"), SessionState::AwaitingMore { index: 0 });

        s.apply(SessionEvent::Tick, fixed_now()).unwrap();
        assert_eq!(s.state(), &SessionState::AwaitingMore { index: 0 });
        assert_eq!(
            s.apply(SessionEvent::Tick, fixed_now()).unwrap(),
            SessionState::Finished(SessionEnd::TimedOut { pending: None })
        );

        assert_eq!(s.records().len(), 1);
        let result = s.build_result().unwrap().unwrap();
        assert_eq!(result.total(), 1);
        assert_eq!(result.correct(), 1);
        assert_eq!(result.unanswered(), 0);
        assert_eq!(result.questions().len(), 1);
    }

    #[test]
    fn events_after_finish_are_rejected_but_ticks_are_ignored() {
        let mut s = session(timed(1, 1), &["q1"], LoaderStatus::finished());
        s.apply(SessionEvent::Tick, fixed_now()).unwrap();
        assert!(s.is_finished());

        assert!(s.apply(SessionEvent::Tick, fixed_now()).is_ok());
        assert!(matches!(
            s.apply(SessionEvent::Commit, fixed_now()),
            Err(SessionError::Finished)
        ));
        assert!(matches!(
            s.apply(SessionEvent::Abandon, fixed_now()),
            Err(SessionError::Finished)
        ));
    }

    #[test]
    fn explicit_finish_drops_uncommitted_question() {
        let mut s = session(timed(3, 300), &["q1", "q2", "q3"], LoaderStatus::finished());
        answer(&mut s, "A");
        s.apply(SessionEvent::Select(label("B")), fixed_now()).unwrap();

        let state = s.apply(SessionEvent::Finish, fixed_now()).unwrap();
        assert_eq!(state, SessionState::Finished(SessionEnd::EndedByUser));
        let result = s.build_result().unwrap().unwrap();
        assert_eq!(result.reason(), FinishReason::EndedByUser);
        assert_eq!(result.total(), 1);
    }

    #[test]
    fn abandoned_session_is_not_scored() {
        let mut s = session(timed(3, 300), &["q1", "q2", "q3"], LoaderStatus::finished());
        answer(&mut s, "A");
        s.apply(SessionEvent::Abandon, fixed_now()).unwrap();
        assert!(s.build_result().unwrap().is_none());
    }

    #[test]
    fn running_session_cannot_be_scored() {
        let s = session(timed(3, 300), &["q1", "q2", "q3"], LoaderStatus::finished());
        assert!(matches!(
            s.build_result(),
            Err(SessionError::NotAllowed("scoring"))
        ));
    }

    #[test]
    fn short_collection_without_loader_completes_early() {
        let mut s = session(timed(5, 300), &["q1", "q2"], LoaderStatus::finished());
        answer(&mut s, "A");
        assert_eq!(
            answer(&mut s, "A"),
            SessionState::Finished(SessionEnd::Completed)
        );
        assert_eq!(s.records().len(), 2);
    }

    #[test]
    fn awaiting_more_needs_an_explicit_action_after_growth() {
        let questions = SharedQuestions::from_batch(vec![question("q1")], 3);
        let mut s = ExamSession::start(
            SessionId::generate(),
            timed(3, 300),
            profile(),
            questions.clone(),
            LoaderStatus::pinned_active(),
            fixed_now(),
        )
        .unwrap();

        assert_eq!(answer(&mut s, "A"), SessionState::AwaitingMore { index: 0 });
        assert!(s.view().waiting_for_more);

        questions.append_unique(vec![question("q2")], 3);
        assert_eq!(s.state(), &SessionState::AwaitingMore { index: 0 });
        assert_eq!(
            s.apply(SessionEvent::Next, fixed_now()).unwrap(),
            SessionState::Presenting { index: 1 }
        );
        assert_eq!(s.records().len(), 1);
    }
}
