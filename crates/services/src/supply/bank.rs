use std::sync::Arc;

use async_trait::async_trait;
use exam_core::model::Question;
use rand::seq::SliceRandom;
use storage::repository::QuestionBankRepository;

use super::{FetchRequest, QuestionSupply};
use crate::error::SupplyError;

/// Serves questions from the local bank in random order.
///
/// Skips the ids listed in the request, so one exam never gets a question twice and an
/// exhausted bank yields empty batches. Holds no per-exam state, so concurrent exams
/// can share one instance.
pub struct BankQuestionSupply {
    bank: Arc<dyn QuestionBankRepository>,
}

impl BankQuestionSupply {
    #[must_use]
    pub fn new(bank: Arc<dyn QuestionBankRepository>) -> Self {
        Self { bank }
    }
}

#[async_trait]
impl QuestionSupply for BankQuestionSupply {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Question>, SupplyError> {
        let mut pool = self.bank.list_questions(&request.profile, u32::MAX).await?;

        pool.retain(|q| !request.exclude.contains(q.id()));
        pool.shuffle(&mut rand::rng());
        pool.truncate(usize::try_from(request.count).unwrap_or(usize::MAX));

        tracing::debug!(served = pool.len(), skipped = request.exclude.len(), "bank batch");
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use exam_core::model::{OptionLabel, QuestionId, QuestionDraft, QuestionOption, SubjectProfile};
    use storage::repository::InMemoryRepository;

    fn question(id: &str) -> Question {
        QuestionDraft {
            id: id.into(),
            prompt: format!("Pregunta {id}"),
            context: None,
            options: ["A", "B"]
                .into_iter()
                .map(|l| QuestionOption {
                    label: OptionLabel::new(l).unwrap(),
                    text: l.to_lowercase(),
                })
                .collect(),
            correct: "A".into(),
            competency: "Pedagógica".into(),
            difficulty: Default::default(),
            reference: Default::default(),
        }
        .validate()
        .unwrap()
    }

    async fn supply_with(ids: &[&str]) -> (BankQuestionSupply, SubjectProfile) {
        let repo = InMemoryRepository::new();
        let profile = SubjectProfile::new("Docente de aula", "Matemáticas").unwrap();
        let qs: Vec<Question> = ids.iter().map(|id| question(id)).collect();
        repo.upsert_questions(&profile, &qs).await.unwrap();
        (BankQuestionSupply::new(Arc::new(repo)), profile)
    }

    #[tokio::test]
    async fn skips_excluded_ids() {
        let (supply, profile) = supply_with(&["q1", "q2", "q3"]).await;
        let held: HashSet<QuestionId> = ["q1", "q3"]
            .into_iter()
            .map(|id| QuestionId::new(id).unwrap())
            .collect();

        let batch = supply
            .fetch(&FetchRequest::new(profile.clone(), 5).with_exclude(held.clone()))
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id().as_str(), "q2");

        let all: HashSet<QuestionId> = held.into_iter().chain([batch[0].id().clone()]).collect();
        let exhausted = supply
            .fetch(&FetchRequest::new(profile, 5).with_exclude(all))
            .await
            .unwrap();
        assert!(exhausted.is_empty());
    }

    #[tokio::test]
    async fn requests_without_exclusions_see_the_whole_bank() {
        let (supply, profile) = supply_with(&["q1", "q2", "q3"]).await;

        let first = supply.fetch(&FetchRequest::new(profile.clone(), 2)).await.unwrap();
        let second = supply
            .fetch(&FetchRequest::new(profile, 5).with_force_refresh(true))
            .await
            .unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 3);
    }
}
