use exam_core::model::ExamResult;

use super::SqliteRepository;
use super::mapping::{db_err, map_result_row, map_result_row_with_id, ser};
use crate::repository::{ExamResultRepository, ExamResultRow, ResultFilter, StorageError};

const RESULT_COLUMNS: &str = r"
    id, session_id, mode, role, area, competency, target_count,
    started_at, completed_at, reason, total, correct, unanswered,
    records_json, questions_json
";

#[async_trait::async_trait]
impl ExamResultRepository for SqliteRepository {
    async fn append_result(&self, result: &ExamResult) -> Result<i64, StorageError> {
        let records_json = serde_json::to_string(result.records()).map_err(ser)?;
        let questions_json = serde_json::to_string(result.questions()).map_err(ser)?;
        let profile = result.profile();

        let res = sqlx::query(
            r"
                INSERT INTO exam_results (
                    session_id, mode, role, area, competency, target_count,
                    started_at, completed_at, reason, total, correct, unanswered,
                    records_json, questions_json
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ",
        )
        .bind(result.session_id().to_string())
        .bind(result.mode().as_str())
        .bind(profile.role())
        .bind(profile.area())
        .bind(profile.competency())
        .bind(i64::from(result.target_count()))
        .bind(result.started_at())
        .bind(result.completed_at())
        .bind(result.reason().as_str())
        .bind(i64::from(result.total()))
        .bind(i64::from(result.correct()))
        .bind(i64::from(result.unanswered()))
        .bind(records_json)
        .bind(questions_json)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_result(&self, id: i64) -> Result<ExamResult, StorageError> {
        let sql = format!("SELECT {RESULT_COLUMNS} FROM exam_results WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn list_result_rows(
        &self,
        filter: &ResultFilter,
        limit: u32,
    ) -> Result<Vec<ExamResultRow>, StorageError> {
        let mut sql = format!("SELECT {RESULT_COLUMNS} FROM exam_results WHERE 1 = 1");

        let mut bind_index = 1;
        for (column, op, present) in [
            ("role", "=", filter.role.is_some()),
            ("area", "=", filter.area.is_some()),
            ("completed_at", ">=", filter.completed_from.is_some()),
            ("completed_at", "<=", filter.completed_until.is_some()),
        ] {
            if present {
                sql.push_str(&format!(" AND {column} {op} ?{bind_index}"));
                bind_index += 1;
            }
        }
        sql.push_str(" ORDER BY completed_at DESC, id DESC");
        sql.push_str(&format!(" LIMIT ?{bind_index}"));

        let mut query = sqlx::query(&sql);
        if let Some(role) = &filter.role {
            query = query.bind(role.as_str());
        }
        if let Some(area) = &filter.area {
            query = query.bind(area.as_str());
        }
        if let Some(from) = filter.completed_from {
            query = query.bind(from);
        }
        if let Some(until) = filter.completed_until {
            query = query.bind(until);
        }
        query = query.bind(i64::from(limit));

        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row_with_id(&row)?);
        }

        Ok(out)
    }
}
