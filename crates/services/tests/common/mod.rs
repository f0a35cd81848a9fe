#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use exam_core::model::{OptionLabel, Question, QuestionDraft, QuestionOption, SubjectProfile};
use services::{FetchRequest, QuestionSupply, SupplyError};

pub fn profile() -> SubjectProfile {
    SubjectProfile::new("Docente de aula", "Lenguaje").unwrap()
}

/// Two-option question; `A` is correct.
pub fn question(id: &str) -> Question {
    QuestionDraft {
        id: id.into(),
        prompt: format!("Pregunta {id}"),
        context: None,
        options: vec![
            QuestionOption {
                label: OptionLabel::new("A").unwrap(),
                text: "Correcta".into(),
            },
            QuestionOption {
                label: OptionLabel::new("B").unwrap(),
                text: "Incorrecta".into(),
            },
        ],
        correct: "A".into(),
        competency: "Pedagógica".into(),
        difficulty: Default::default(),
        reference: Default::default(),
    }
    .validate()
    .unwrap()
}

pub fn batch(ids: &[&str]) -> Vec<Question> {
    ids.iter().map(|id| question(id)).collect()
}

pub fn ids(questions: &[Question]) -> Vec<String> {
    questions.iter().map(|q| q.id().as_str().to_string()).collect()
}

/// Replays a fixed script of batches, then returns empty batches forever.
pub struct ScriptedSupply {
    script: Mutex<VecDeque<Result<Vec<Question>, SupplyError>>>,
    calls: AtomicUsize,
}

impl ScriptedSupply {
    pub fn new(script: Vec<Result<Vec<Question>, SupplyError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionSupply for ScriptedSupply {
    async fn fetch(&self, _request: &FetchRequest) -> Result<Vec<Question>, SupplyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Returns `count` fresh questions per call after a fixed delay.
pub struct SlowSupply {
    delay: Duration,
    next: AtomicUsize,
}

impl SlowSupply {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next: AtomicUsize::new(1),
        }
    }
}

#[async_trait]
impl QuestionSupply for SlowSupply {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Question>, SupplyError> {
        tokio::time::sleep(self.delay).await;
        let count = usize::try_from(request.count).unwrap();
        let start = self.next.fetch_add(count, Ordering::SeqCst);
        Ok((start..start + count)
            .map(|n| question(&format!("q{n}")))
            .collect())
    }
}
