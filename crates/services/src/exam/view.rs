use exam_core::model::{NormativeReference, OptionLabel, Question};

use super::progress::ExamProgress;
use super::session::{ExamSession, SessionEnd, SessionState};

/// Coarse state tag for renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Presenting,
    Feedback,
    AwaitingMore,
    Finished(SessionEnd),
}

/// Correctness feedback shown after a practice answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFeedback {
    pub is_correct: bool,
    pub chosen: Option<OptionLabel>,
    pub correct: OptionLabel,
    pub reference: NormativeReference,
}

/// Presentation-agnostic snapshot of a session.
///
/// Renderers decide which actions to offer from the `can_*` flags only.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub question: Option<Question>,
    pub selected: Option<OptionLabel>,
    pub feedback: Option<AnswerFeedback>,
    pub can_select: bool,
    pub can_commit: bool,
    pub can_next: bool,
    pub can_finish: bool,
    pub waiting_for_more: bool,
    pub progress: ExamProgress,
    pub remaining_secs: Option<u32>,
}

impl SessionView {
    #[must_use]
    pub fn of(session: &ExamSession) -> Self {
        let selected = session.selected().cloned();
        let phase = match session.state() {
            SessionState::Presenting { .. } => SessionPhase::Presenting,
            SessionState::Feedback { .. } => SessionPhase::Feedback,
            SessionState::AwaitingMore { .. } => SessionPhase::AwaitingMore,
            SessionState::Finished(end) => SessionPhase::Finished(end.clone()),
        };
        let question = session.current_question();

        let feedback = match (&phase, &question, session.records().last()) {
            (SessionPhase::Feedback, Some(question), Some(record)) => Some(AnswerFeedback {
                is_correct: record.is_correct,
                chosen: record.chosen.clone(),
                correct: question.correct().clone(),
                reference: question.reference().clone(),
            }),
            _ => None,
        };

        let presenting = phase == SessionPhase::Presenting;
        let waiting_for_more = phase == SessionPhase::AwaitingMore;
        let finished = matches!(phase, SessionPhase::Finished(_));

        Self {
            can_select: presenting,
            can_commit: (presenting && selected.is_some()) || waiting_for_more,
            can_next: phase == SessionPhase::Feedback || waiting_for_more,
            can_finish: !finished,
            waiting_for_more,
            progress: session.progress(),
            remaining_secs: session.remaining_secs(),
            phase,
            question,
            selected,
            feedback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::loader::LoaderStatus;
    use crate::exam::questions::SharedQuestions;
    use crate::exam::session::SessionEvent;
    use crate::testing::{profile, question};
    use exam_core::model::{ExamConfig, ExamMode, SessionId};
    use exam_core::time::fixed_now;

    #[test]
    fn affordances_follow_the_state() {
        let questions = SharedQuestions::from_batch(vec![question("q1"), question("q2")], 10);
        let mut session = ExamSession::start(
            SessionId::generate(),
            ExamConfig::for_mode(ExamMode::Simulation)
                .with_target_count(2)
                .unwrap(),
            profile(),
            questions,
            LoaderStatus::finished(),
            fixed_now(),
        )
        .unwrap();

        let view = session.view();
        assert_eq!(view.phase, SessionPhase::Presenting);
        assert!(view.can_select);
        assert!(!view.can_commit);
        assert!(!view.can_next);
        assert_eq!(view.remaining_secs, Some(240));
        assert_eq!(view.progress.position, 1);
        assert_eq!(view.progress.available, 2);

        session
            .apply(
                SessionEvent::Select(OptionLabel::new("a").unwrap()),
                fixed_now(),
            )
            .unwrap();
        let view = session.view();
        assert!(view.can_commit);
        assert_eq!(view.selected.unwrap().as_str(), "A");
        assert!(view.feedback.is_none());

        session.apply(SessionEvent::Finish, fixed_now()).unwrap();
        let view = session.view();
        assert_eq!(view.phase, SessionPhase::Finished(SessionEnd::EndedByUser));
        assert!(view.question.is_none());
        assert!(!view.can_finish);
        assert!(!view.can_select);
    }
}
