//! Fixtures shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use exam_core::model::{OptionLabel, Question, QuestionDraft, QuestionOption, SubjectProfile};

use crate::error::SupplyError;
use crate::supply::{FetchRequest, QuestionSupply};

pub(crate) fn profile() -> SubjectProfile {
    SubjectProfile::new("Docente de aula", "Matemáticas").unwrap()
}

/// Four-option question whose correct answer is `A`.
pub(crate) fn question(id: &str) -> Question {
    question_in(id, "Pedagógica")
}

pub(crate) fn question_in(id: &str, competency: &str) -> Question {
    QuestionDraft {
        id: id.into(),
        prompt: format!("Pregunta {id}"),
        context: None,
        options: ["A", "B", "C", "D"]
            .into_iter()
            .map(|label| QuestionOption {
                label: OptionLabel::new(label).unwrap(),
                text: format!("Opción {label}"),
            })
            .collect(),
        correct: "A".into(),
        competency: competency.into(),
        difficulty: Default::default(),
        reference: Default::default(),
    }
    .validate()
    .unwrap()
}

/// Replays scripted batches; `Err(())` becomes a supply failure. Empty once the script runs out.
pub(crate) struct ScriptedSupply {
    script: Mutex<VecDeque<Result<Vec<Question>, ()>>>,
    requested: Mutex<Vec<u32>>,
}

impl ScriptedSupply {
    pub(crate) fn new(script: Vec<Result<Vec<Question>, ()>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuestionSupply for ScriptedSupply {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Question>, SupplyError> {
        self.requested.lock().unwrap().push(request.count);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(())) => Err(SupplyError::EmptyResponse),
            None => Ok(Vec::new()),
        }
    }
}
