//! Question supply port and its implementations.

use std::collections::HashSet;

use async_trait::async_trait;
use exam_core::model::{Question, QuestionId, SubjectProfile};

use crate::error::SupplyError;

mod ai;
mod bank;

pub use ai::{AiQuestionSupply, AiSupplyConfig};
pub use bank::BankQuestionSupply;

/// Parameters for one batch fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub profile: SubjectProfile,
    pub count: u32,
    /// Set on the first fetch of a new exam.
    pub force_refresh: bool,
    /// Ids the requesting exam already holds.
    pub exclude: HashSet<QuestionId>,
}

impl FetchRequest {
    #[must_use]
    pub fn new(profile: SubjectProfile, count: u32) -> Self {
        Self {
            profile,
            count,
            force_refresh: false,
            exclude: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    #[must_use]
    pub fn with_exclude(mut self, exclude: HashSet<QuestionId>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Competency filter carried by the profile, if any.
    #[must_use]
    pub fn competency(&self) -> Option<&str> {
        self.profile.competency()
    }
}

/// Source of exam questions.
///
/// Implementations may return fewer than `count` questions, may repeat questions they
/// returned before, and may fail transiently. Callers de-duplicate.
#[async_trait]
pub trait QuestionSupply: Send + Sync {
    /// Fetch up to `request.count` questions.
    ///
    /// # Errors
    ///
    /// Returns `SupplyError` when the underlying source fails.
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Question>, SupplyError>;
}
