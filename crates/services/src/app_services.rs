use std::sync::Arc;

use storage::repository::{QuestionBankRepository, Storage};

use crate::Clock;
use crate::config::ServicesConfig;
use crate::error::ExamServicesError;
use crate::exam::{ExamHistoryService, ExamLoopService};
use crate::supply::{AiQuestionSupply, BankQuestionSupply, QuestionSupply};

/// Where exam questions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyKind {
    /// Generated questions, cached into the bank.
    Ai,
    /// Previously generated or seeded questions.
    Bank,
}

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct ExamServices {
    supply_kind: SupplyKind,
    bank: Arc<dyn QuestionBankRepository>,
    exam_loop: Arc<ExamLoopService>,
    history: Arc<ExamHistoryService>,
}

impl ExamServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Uses the AI supply when it is configured, the question bank otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ExamServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        config: &ServicesConfig,
        clock: Clock,
    ) -> Result<Self, ExamServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        let kind = if config.ai.is_some() {
            SupplyKind::Ai
        } else {
            SupplyKind::Bank
        };
        Ok(Self::from_storage(storage, clock, kind, config))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        let config = ServicesConfig {
            db_url: String::new(),
            ai: None,
        };
        Self::from_storage(Storage::in_memory(), clock, SupplyKind::Bank, &config)
    }

    fn from_storage(
        storage: Storage,
        clock: Clock,
        kind: SupplyKind,
        config: &ServicesConfig,
    ) -> Self {
        let supply: Arc<dyn QuestionSupply> = match kind {
            SupplyKind::Ai => Arc::new(
                AiQuestionSupply::new(config.ai.clone()).with_bank(Arc::clone(&storage.bank)),
            ),
            SupplyKind::Bank => Arc::new(BankQuestionSupply::new(Arc::clone(&storage.bank))),
        };

        let exam_loop = Arc::new(ExamLoopService::new(
            clock,
            supply,
            Arc::clone(&storage.results),
        ));
        let history = Arc::new(ExamHistoryService::new(clock, Arc::clone(&storage.results)));

        Self {
            supply_kind: kind,
            bank: storage.bank,
            exam_loop,
            history,
        }
    }

    #[must_use]
    pub fn supply_kind(&self) -> SupplyKind {
        self.supply_kind
    }

    #[must_use]
    pub fn bank(&self) -> Arc<dyn QuestionBankRepository> {
        Arc::clone(&self.bank)
    }

    #[must_use]
    pub fn exam_loop(&self) -> Arc<ExamLoopService> {
        Arc::clone(&self.exam_loop)
    }

    #[must_use]
    pub fn history(&self) -> Arc<ExamHistoryService> {
        Arc::clone(&self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::SessionError;
    use crate::testing::{profile, question};
    use exam_core::model::{ExamConfig, ExamMode};
    use exam_core::time::fixed_clock;

    #[tokio::test]
    async fn in_memory_services_draw_from_the_bank() {
        let services = ExamServices::in_memory(fixed_clock());
        assert_eq!(services.supply_kind(), SupplyKind::Bank);

        let config = ExamConfig::for_mode(ExamMode::Quick).with_target_count(2).unwrap();
        let err = services
            .exam_loop()
            .start_exam(config.clone(), profile())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Empty));

        services
            .bank()
            .upsert_questions(&profile(), &[question("q1"), question("q2")])
            .await
            .unwrap();
        let run = services.exam_loop().start_exam(config, profile()).await.unwrap();
        assert_eq!(run.session().questions().len(), 2);
        assert!(!run.loader_active());
    }
}
