use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use exam_core::model::SubjectProfile;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::questions::SharedQuestions;
use crate::supply::{FetchRequest, QuestionSupply};

/// Consecutive empty or failed fetches after which the loader gives up.
pub const FAILURE_BUDGET: u32 = 3;

//
// ─── PLAN & TIMING ─────────────────────────────────────────────────────────────
//

/// Delays applied between fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderTiming {
    pub between_batches: Duration,
    pub failure_cooldown: Duration,
}

impl Default for LoaderTiming {
    fn default() -> Self {
        Self {
            between_batches: Duration::from_millis(500),
            failure_cooldown: Duration::from_secs(2),
        }
    }
}

/// What one loader run should fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderPlan {
    pub profile: SubjectProfile,
    pub target: usize,
    pub chunk_size: usize,
}

//
// ─── REPORT ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderStop {
    TargetReached,
    Cancelled,
    BudgetExhausted,
}

/// Summary of a finished loader run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderReport {
    pub stop: LoaderStop,
    pub attempts: u32,
    pub appended: usize,
}

//
// ─── STATUS & HANDLE ───────────────────────────────────────────────────────────
//

/// Read-only view of a loader's "still loading" flag.
#[derive(Debug, Clone)]
pub struct LoaderStatus {
    active: Arc<AtomicBool>,
}

impl LoaderStatus {
    /// Status of a loader that is not running.
    #[must_use]
    pub fn finished() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn pinned_active() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// Clears the active flag when the loader task ends, however it ends.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of a spawned loader. Dropping the handle cancels the loader.
#[derive(Debug)]
pub struct LoaderHandle {
    status: LoaderStatus,
    cancel: CancellationToken,
    task: Option<JoinHandle<LoaderReport>>,
}

impl LoaderHandle {
    /// Handle for an exam whose first batch already covers the target.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            status: LoaderStatus::finished(),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> LoaderStatus {
        self.status.clone()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Ask the loader to stop before its next fetch.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the loader task to exit. `None` for idle handles or a panicked task.
    pub async fn join(mut self) -> Option<LoaderReport> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl Drop for LoaderHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

//
// ─── LOADER ────────────────────────────────────────────────────────────────────
//

/// Extends a `SharedQuestions` collection in the background until it reaches its target.
#[derive(Clone)]
pub struct ProgressiveLoader {
    supply: Arc<dyn QuestionSupply>,
    timing: LoaderTiming,
}

impl ProgressiveLoader {
    #[must_use]
    pub fn new(supply: Arc<dyn QuestionSupply>) -> Self {
        Self {
            supply,
            timing: LoaderTiming::default(),
        }
    }

    #[must_use]
    pub fn with_timing(mut self, timing: LoaderTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Run the loader on the current tokio runtime.
    ///
    /// The returned handle reports active until the task exits.
    #[must_use]
    pub fn spawn(
        &self,
        plan: LoaderPlan,
        questions: SharedQuestions,
        cancel: CancellationToken,
    ) -> LoaderHandle {
        let active = Arc::new(AtomicBool::new(true));
        let guard = ActiveGuard(Arc::clone(&active));
        let loader = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            loader.run(&plan, &questions, &token).await
        });

        LoaderHandle {
            status: LoaderStatus { active },
            cancel,
            task: Some(task),
        }
    }

    /// Fetch chunks until the target is reached, the token is cancelled, or
    /// `FAILURE_BUDGET` consecutive fetches come back empty or failed.
    ///
    /// A fetch already in flight when the token is cancelled still merges its result.
    pub async fn run(
        &self,
        plan: &LoaderPlan,
        questions: &SharedQuestions,
        cancel: &CancellationToken,
    ) -> LoaderReport {
        let mut attempts = 0_u32;
        let mut failures = 0_u32;
        let mut appended = 0_usize;

        let stop = loop {
            let loaded = questions.len();
            if loaded >= plan.target {
                break LoaderStop::TargetReached;
            }
            if cancel.is_cancelled() {
                break LoaderStop::Cancelled;
            }

            let to_fetch = plan.chunk_size.min(plan.target - loaded);
            let request = FetchRequest::new(
                plan.profile.clone(),
                u32::try_from(to_fetch).unwrap_or(u32::MAX),
            )
            .with_exclude(questions.id_set());
            attempts += 1;

            let delay = match self.supply.fetch(&request).await {
                Ok(batch) if !batch.is_empty() => {
                    let received = batch.len();
                    let added = questions.append_unique(batch, loaded + to_fetch);
                    appended += added;
                    failures = 0;
                    tracing::debug!(
                        attempt = attempts,
                        received,
                        added,
                        loaded = questions.len(),
                        target = plan.target,
                        "loader batch merged"
                    );
                    self.timing.between_batches
                }
                Ok(_) => {
                    failures += 1;
                    tracing::debug!(attempt = attempts, failures, "loader batch empty");
                    self.timing.failure_cooldown
                }
                Err(err) => {
                    failures += 1;
                    tracing::warn!(attempt = attempts, failures, error = %err, "loader fetch failed");
                    self.timing.failure_cooldown
                }
            };

            if failures >= FAILURE_BUDGET {
                tracing::warn!(
                    loaded = questions.len(),
                    target = plan.target,
                    "loader failure budget exhausted"
                );
                break LoaderStop::BudgetExhausted;
            }
            if questions.len() >= plan.target {
                break LoaderStop::TargetReached;
            }

            tokio::select! {
                () = cancel.cancelled() => break LoaderStop::Cancelled,
                () = tokio::time::sleep(delay) => {}
            }
        };

        tracing::debug!(?stop, attempts, appended, "loader stopped");
        LoaderReport {
            stop,
            attempts,
            appended,
        }
    }
}
