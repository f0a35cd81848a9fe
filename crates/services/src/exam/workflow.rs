use std::sync::Arc;

use exam_core::model::{ExamConfig, SessionId, SubjectProfile};
use storage::repository::ExamResultRepository;
use tokio_util::sync::CancellationToken;

use super::loader::{LoaderHandle, LoaderPlan, LoaderTiming, ProgressiveLoader};
use super::questions::SharedQuestions;
use super::session::{ExamSession, SessionEvent, SessionState};
use super::view::SessionView;
use crate::Clock;
use crate::error::SessionError;
use crate::supply::{FetchRequest, QuestionSupply};

/// Outcome of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamStep {
    pub state: SessionState,
    pub result_id: Option<i64>,
}

/// A running exam: the session plus the loader feeding it.
///
/// Dropping the run cancels its loader.
#[derive(Debug)]
pub struct ExamRun {
    session: ExamSession,
    loader: LoaderHandle,
}

impl ExamRun {
    #[must_use]
    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        self.session.view()
    }

    #[must_use]
    pub fn loader_active(&self) -> bool {
        self.loader.is_active()
    }

    /// Stop the background loader without touching the session.
    pub fn cancel_loader(&self) {
        self.loader.cancel();
    }

    /// Split the run, e.g. to wait for the loader in tests.
    #[must_use]
    pub fn into_parts(self) -> (ExamSession, LoaderHandle) {
        (self.session, self.loader)
    }
}

/// Orchestrates exam start, event dispatch, and result persistence.
#[derive(Clone)]
pub struct ExamLoopService {
    clock: Clock,
    supply: Arc<dyn QuestionSupply>,
    results: Arc<dyn ExamResultRepository>,
    timing: LoaderTiming,
}

impl ExamLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        supply: Arc<dyn QuestionSupply>,
        results: Arc<dyn ExamResultRepository>,
    ) -> Self {
        Self {
            clock,
            supply,
            results,
            timing: LoaderTiming::default(),
        }
    }

    #[must_use]
    pub fn with_timing(mut self, timing: LoaderTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Fetch the first batch and start a session on it.
    ///
    /// A background loader is spawned when the target exceeds the first batch size; it
    /// requires a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Supply` if the first fetch fails and `SessionError::Empty`
    /// if it yields no questions. Neither is retried.
    pub async fn start_exam(
        &self,
        config: ExamConfig,
        profile: SubjectProfile,
    ) -> Result<ExamRun, SessionError> {
        let initial = config.initial_batch_size();
        let request = FetchRequest::new(profile.clone(), initial).with_force_refresh(true);
        let batch = self.supply.fetch(&request).await?;
        let questions = SharedQuestions::from_batch(
            batch,
            usize::try_from(initial).unwrap_or(usize::MAX),
        );
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        let loader = if config.needs_progressive_loading() {
            let plan = LoaderPlan {
                profile: profile.clone(),
                target: usize::try_from(config.target_count()).unwrap_or(usize::MAX),
                chunk_size: usize::try_from(config.chunk_size()).unwrap_or(usize::MAX),
            };
            ProgressiveLoader::new(Arc::clone(&self.supply))
                .with_timing(self.timing)
                .spawn(plan, questions.clone(), CancellationToken::new())
        } else {
            LoaderHandle::idle()
        };

        let session = ExamSession::start(
            SessionId::generate(),
            config,
            profile,
            questions,
            loader.status(),
            self.clock.now(),
        )?;
        tracing::info!(
            session = %session.id(),
            mode = %session.config().mode(),
            target = session.config().target_count(),
            loaded = session.questions().len(),
            background = loader.is_active(),
            "exam started"
        );

        Ok(ExamRun { session, loader })
    }

    /// Apply an event to the run. When the session finishes, the loader is cancelled and
    /// a scorable result is persisted once.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for rejected events or persistence failures. A failed
    /// persistence can be retried with [`ExamLoopService::finalize_result`].
    pub async fn handle(
        &self,
        run: &mut ExamRun,
        event: SessionEvent,
    ) -> Result<ExamStep, SessionError> {
        let state = run.session.apply(event, self.clock.now())?;

        if state.is_finished() {
            run.loader.cancel();
            self.finalize_result(run).await?;
        }

        Ok(ExamStep {
            state,
            result_id: run.session.result_id(),
        })
    }

    /// Abandon the run: stop loading and discard answers.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` if the session already ended.
    pub fn abandon(&self, run: &mut ExamRun) -> Result<(), SessionError> {
        run.loader.cancel();
        run.session.apply(SessionEvent::Abandon, self.clock.now())?;
        Ok(())
    }

    /// Persist the finished session's result if not yet stored.
    ///
    /// Returns the stored id, or `None` for abandoned sessions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAllowed` if the session is still running,
    /// or `SessionError::Storage` if persistence fails.
    pub async fn finalize_result(&self, run: &mut ExamRun) -> Result<Option<i64>, SessionError> {
        if let Some(id) = run.session.result_id() {
            return Ok(Some(id));
        }

        let Some(result) = run.session.build_result()? else {
            return Ok(None);
        };
        let id = self.results.append_result(&result).await?;
        run.session.set_result_id(id);
        tracing::info!(
            session = %result.session_id(),
            result_id = id,
            reason = result.reason().as_str(),
            score = result.score_percent(),
            "exam result stored"
        );
        Ok(Some(id))
    }
}
