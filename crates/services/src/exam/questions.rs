use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use exam_core::model::{Question, QuestionId};

#[derive(Debug, Default)]
struct Inner {
    items: Vec<Question>,
    ids: HashSet<QuestionId>,
}

/// Append-only question collection shared by a session and its background loader.
///
/// Questions never move once appended, so an index stays valid for the life of the
/// collection. Ids are unique.
#[derive(Debug, Clone, Default)]
pub struct SharedQuestions {
    inner: Arc<RwLock<Inner>>,
}

impl SharedQuestions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from a first batch, dropping duplicates and stopping at `cap`.
    #[must_use]
    pub fn from_batch(batch: Vec<Question>, cap: usize) -> Self {
        let questions = Self::new();
        questions.append_unique(batch, cap);
        questions
    }

    /// Append questions whose ids are not present yet, never growing past `cap` items.
    ///
    /// Returns how many were appended.
    pub fn append_unique(&self, batch: Vec<Question>, cap: usize) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut appended = 0;
        for question in batch {
            if inner.items.len() >= cap {
                break;
            }
            if inner.ids.insert(question.id().clone()) {
                inner.items.push(question);
                appended += 1;
            }
        }
        appended
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read(|inner| inner.items.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Question> {
        self.read(|inner| inner.items.get(index).cloned())
    }

    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.read(|inner| inner.ids.contains(id))
    }

    /// Ids currently in the collection.
    #[must_use]
    pub fn id_set(&self) -> HashSet<QuestionId> {
        self.read(|inner| inner.ids.clone())
    }

    /// Clone of the first `len` questions.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Vec<Question> {
        self.read(|inner| inner.items.iter().take(len).cloned().collect())
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Question> {
        self.read(|inner| inner.items.clone())
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&inner)
    }
}
