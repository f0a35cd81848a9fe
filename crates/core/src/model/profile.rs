use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("profile role cannot be empty")]
    EmptyRole,

    #[error("profile area cannot be empty")]
    EmptyArea,
}

/// Who the exam is for: the teaching role and subject area, optionally narrowed
/// to one competency. Passed to every question fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectProfile {
    role: String,
    area: String,
    competency: Option<String>,
}

impl SubjectProfile {
    /// # Errors
    ///
    /// Returns `ProfileError` if role or area are blank.
    pub fn new(role: impl Into<String>, area: impl Into<String>) -> Result<Self, ProfileError> {
        let role = role.into().trim().to_string();
        if role.is_empty() {
            return Err(ProfileError::EmptyRole);
        }
        let area = area.into().trim().to_string();
        if area.is_empty() {
            return Err(ProfileError::EmptyArea);
        }
        Ok(Self {
            role,
            area,
            competency: None,
        })
    }

    /// Narrow the profile to a single competency. Blank values clear the filter.
    #[must_use]
    pub fn with_competency(mut self, competency: Option<String>) -> Self {
        self.competency = competency
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }

    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    #[must_use]
    pub fn area(&self) -> &str {
        &self.area
    }

    #[must_use]
    pub fn competency(&self) -> Option<&str> {
        self.competency.as_deref()
    }
}
