use chrono::Utc;
use exam_core::model::{Question, SubjectProfile};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, question_from_json, question_to_json, ser};
use crate::repository::{QuestionBankRepository, StorageError};

#[async_trait::async_trait]
impl QuestionBankRepository for SqliteRepository {
    async fn upsert_questions(
        &self,
        profile: &SubjectProfile,
        questions: &[Question],
    ) -> Result<usize, StorageError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for question in questions {
            sqlx::query(
                r"
                INSERT INTO question_bank (
                    question_id, role, area, competency, difficulty, payload, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(question_id, role, area) DO UPDATE SET
                    -- keep seq from the original insert so listing order is stable
                    competency = excluded.competency,
                    difficulty = excluded.difficulty,
                    payload = excluded.payload,
                    updated_at = excluded.updated_at
                ",
            )
            .bind(question.id().as_str())
            .bind(profile.role())
            .bind(profile.area())
            .bind(question.competency())
            .bind(question.difficulty().as_str())
            .bind(question_to_json(question)?)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(questions.len())
    }

    async fn list_questions(
        &self,
        profile: &SubjectProfile,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT payload
                FROM question_bank
                WHERE role = ?1 AND area = ?2 AND (?3 IS NULL OR competency = ?3)
                ORDER BY seq ASC
                LIMIT ?4
            ",
        )
        .bind(profile.role())
        .bind(profile.area())
        .bind(profile.competency())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.try_get("payload").map_err(ser)?;
            out.push(question_from_json(&payload)?);
        }
        Ok(out)
    }

    async fn count_questions(&self, profile: &SubjectProfile) -> Result<u64, StorageError> {
        let row = sqlx::query(
            r"
                SELECT COUNT(*) AS n
                FROM question_bank
                WHERE role = ?1 AND area = ?2 AND (?3 IS NULL OR competency = ?3)
            ",
        )
        .bind(profile.role())
        .bind(profile.area())
        .bind(profile.competency())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(|_| StorageError::Serialization(format!("invalid count: {n}")))
    }
}
