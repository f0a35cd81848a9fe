use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamConfigError {
    #[error("target question count must be > 0")]
    InvalidTargetCount,

    #[error("initial batch size must be > 0")]
    InvalidInitialBatchSize,

    #[error("fetch chunk size must be > 0")]
    InvalidChunkSize,

    #[error("timed modes need a time budget > 0 seconds")]
    MissingTimeBudget,

    #[error("unknown exam mode: {0}")]
    UnknownMode(String),
}

//
// ─── MODE ──────────────────────────────────────────────────────────────────────
//

/// How an exam session behaves.
///
/// - `Practice`: untimed, shows correctness feedback after each answer
/// - `Simulation`: full-length timed exam, no feedback until the end
/// - `Quick`: short timed round, no feedback until the end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamMode {
    Practice,
    Simulation,
    Quick,
}

impl ExamMode {
    #[must_use]
    pub fn is_timed(self) -> bool {
        !matches!(self, ExamMode::Practice)
    }

    #[must_use]
    pub fn shows_feedback(self) -> bool {
        matches!(self, ExamMode::Practice)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExamMode::Practice => "practice",
            ExamMode::Simulation => "simulation",
            ExamMode::Quick => "quick",
        }
    }

    /// Default number of questions for a session in this mode.
    #[must_use]
    pub fn default_target_count(self) -> u32 {
        match self {
            ExamMode::Practice | ExamMode::Quick => 10,
            ExamMode::Simulation => 40,
        }
    }

    /// Seconds granted per question in timed modes.
    #[must_use]
    pub fn secs_per_question(self) -> Option<u32> {
        match self {
            ExamMode::Practice => None,
            ExamMode::Simulation => Some(120),
            ExamMode::Quick => Some(90),
        }
    }
}

impl fmt::Display for ExamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamMode {
    type Err = ExamConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "practice" | "practica" | "práctica" => Ok(Self::Practice),
            "simulation" | "simulacro" => Ok(Self::Simulation),
            "quick" | "rapido" | "rápido" => Ok(Self::Quick),
            other => Err(ExamConfigError::UnknownMode(other.to_string())),
        }
    }
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

pub const DEFAULT_INITIAL_BATCH_SIZE: u32 = 3;
pub const DEFAULT_CHUNK_SIZE: u32 = 5;

/// Session parameters fixed at exam start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamConfig {
    mode: ExamMode,
    target_count: u32,
    initial_batch_size: u32,
    chunk_size: u32,
    time_budget_secs: Option<u32>,
}

impl ExamConfig {
    /// Default configuration for a mode.
    #[must_use]
    pub fn for_mode(mode: ExamMode) -> Self {
        let target_count = mode.default_target_count();
        Self {
            mode,
            target_count,
            initial_batch_size: DEFAULT_INITIAL_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            time_budget_secs: mode
                .secs_per_question()
                .map(|per| per.saturating_mul(target_count)),
        }
    }

    /// Creates a custom configuration.
    ///
    /// The time budget is ignored for untimed modes.
    ///
    /// # Errors
    ///
    /// Returns `ExamConfigError` if any size is zero or a timed mode has no budget.
    pub fn new(
        mode: ExamMode,
        target_count: u32,
        initial_batch_size: u32,
        chunk_size: u32,
        time_budget_secs: Option<u32>,
    ) -> Result<Self, ExamConfigError> {
        if target_count == 0 {
            return Err(ExamConfigError::InvalidTargetCount);
        }
        if initial_batch_size == 0 {
            return Err(ExamConfigError::InvalidInitialBatchSize);
        }
        if chunk_size == 0 {
            return Err(ExamConfigError::InvalidChunkSize);
        }

        let time_budget_secs = if mode.is_timed() {
            match time_budget_secs {
                Some(secs) if secs > 0 => Some(secs),
                _ => return Err(ExamConfigError::MissingTimeBudget),
            }
        } else {
            None
        };

        Ok(Self {
            mode,
            target_count,
            initial_batch_size,
            chunk_size,
            time_budget_secs,
        })
    }

    /// Same mode defaults with a different question count; the time budget scales with it.
    ///
    /// # Errors
    ///
    /// Returns `ExamConfigError::InvalidTargetCount` if `target_count` is zero.
    pub fn with_target_count(self, target_count: u32) -> Result<Self, ExamConfigError> {
        Self::new(
            self.mode,
            target_count,
            self.initial_batch_size,
            self.chunk_size,
            self.mode
                .secs_per_question()
                .map(|per| per.saturating_mul(target_count)),
        )
    }

    #[must_use]
    pub fn mode(&self) -> ExamMode {
        self.mode
    }

    #[must_use]
    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    /// Size of the synchronous first fetch, never larger than the target.
    #[must_use]
    pub fn initial_batch_size(&self) -> u32 {
        self.initial_batch_size.min(self.target_count)
    }

    #[must_use]
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    #[must_use]
    pub fn time_budget_secs(&self) -> Option<u32> {
        self.time_budget_secs
    }

    /// Whether a background loader is needed after the first batch.
    #[must_use]
    pub fn needs_progressive_loading(&self) -> bool {
        self.target_count > self.initial_batch_size
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
