use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("option label cannot be empty")]
    EmptyLabel,

    #[error("option {label} has no text")]
    EmptyOptionText { label: String },

    #[error("a question needs at least two options, got {count}")]
    TooFewOptions { count: usize },

    #[error("duplicate option label: {label}")]
    DuplicateLabel { label: String },

    #[error("correct answer {label} is not one of the options")]
    UnknownCorrectLabel { label: String },

    #[error("competency cannot be empty")]
    EmptyCompetency,
}

//
// ─── OPTION LABEL ──────────────────────────────────────────────────────────────
//

/// Label of an answer option ("A", "B", ...), normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OptionLabel(String);

impl OptionLabel {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyLabel` if the label is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, QuestionError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QuestionError::EmptyLabel);
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OptionLabel {
    type Error = QuestionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OptionLabel> for String {
    fn from(value: OptionLabel) -> Self {
        value.0
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── SUPPORTING TYPES ──────────────────────────────────────────────────────────
//

/// One labeled answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub label: OptionLabel,
    pub text: String,
}

/// Difficulty tag attached to generated questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "baja", alias = "facil", alias = "fácil")]
    Low,
    #[default]
    #[serde(alias = "media")]
    Medium,
    #[serde(alias = "alta", alias = "dificil", alias = "difícil")]
    High,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Low => "low",
            Difficulty::Medium => "medium",
            Difficulty::High => "high",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" | "baja" | "facil" | "fácil" => Some(Self::Low),
            "medium" | "media" => Some(Self::Medium),
            "high" | "alta" | "dificil" | "difícil" => Some(Self::High),
            _ => None,
        }
    }
}

/// Legal grounding for the correct answer (law, article, short explanation).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NormativeReference {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub article: Option<String>,
    #[serde(default)]
    pub explanation: String,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it arrives from a supply (generated JSON, bank rows).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub context: Option<String>,
    pub options: Vec<QuestionOption>,
    pub correct: String,
    pub competency: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub reference: NormativeReference,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the id, prompt, competency or options are invalid,
    /// or when the correct label does not match any option.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = QuestionId::new(self.id).map_err(|_| QuestionError::EmptyId)?;

        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }

        let competency = self.competency.trim().to_string();
        if competency.is_empty() {
            return Err(QuestionError::EmptyCompetency);
        }

        if self.options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                count: self.options.len(),
            });
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if option.text.trim().is_empty() {
                return Err(QuestionError::EmptyOptionText {
                    label: option.label.to_string(),
                });
            }
            if !seen.insert(option.label.clone()) {
                return Err(QuestionError::DuplicateLabel {
                    label: option.label.to_string(),
                });
            }
        }

        let correct = OptionLabel::new(self.correct)?;
        if !seen.contains(&correct) {
            return Err(QuestionError::UnknownCorrectLabel {
                label: correct.to_string(),
            });
        }

        let context = self
            .context
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(Question {
            id,
            prompt,
            context,
            options: self.options,
            correct,
            competency,
            difficulty: self.difficulty,
            reference: self.reference,
        })
    }
}

/// Multiple-choice question. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft", into = "QuestionDraft")]
pub struct Question {
    id: QuestionId,
    prompt: String,
    context: Option<String>,
    options: Vec<QuestionOption>,
    correct: OptionLabel,
    competency: String,
    difficulty: Difficulty,
    reference: NormativeReference,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &[QuestionOption] {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> &OptionLabel {
        &self.correct
    }

    #[must_use]
    pub fn competency(&self) -> &str {
        &self.competency
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn reference(&self) -> &NormativeReference {
        &self.reference
    }

    #[must_use]
    pub fn has_option(&self, label: &OptionLabel) -> bool {
        self.options.iter().any(|o| &o.label == label)
    }

    #[must_use]
    pub fn is_correct(&self, label: &OptionLabel) -> bool {
        &self.correct == label
    }
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl From<Question> for QuestionDraft {
    fn from(q: Question) -> Self {
        Self {
            id: q.id.as_str().to_string(),
            prompt: q.prompt,
            context: q.context,
            options: q.options,
            correct: q.correct.into(),
            competency: q.competency,
            difficulty: q.difficulty,
            reference: q.reference,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
