use exam_core::model::{
    AnswerRecord, ExamMode, ExamResult, ExamResultMeta, FinishReason, Question, SessionId,
    SubjectProfile,
};
use sqlx::Row;

use crate::repository::{ExamResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver errors, surfacing unique-constraint violations as `Conflict`.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn parse_mode(s: &str) -> Result<ExamMode, StorageError> {
    s.parse::<ExamMode>().map_err(ser)
}

pub(crate) fn question_to_json(question: &Question) -> Result<String, StorageError> {
    serde_json::to_string(question).map_err(ser)
}

pub(crate) fn question_from_json(payload: &str) -> Result<Question, StorageError> {
    serde_json::from_str(payload).map_err(ser)
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExamResult, StorageError> {
    let session_id: SessionId = row
        .try_get::<String, _>("session_id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let mode = parse_mode(&row.try_get::<String, _>("mode").map_err(ser)?)?;
    let profile = SubjectProfile::new(
        row.try_get::<String, _>("role").map_err(ser)?,
        row.try_get::<String, _>("area").map_err(ser)?,
    )
    .map_err(ser)?
    .with_competency(row.try_get::<Option<String>, _>("competency").map_err(ser)?);
    let reason =
        FinishReason::parse(&row.try_get::<String, _>("reason").map_err(ser)?).map_err(ser)?;

    let records: Vec<AnswerRecord> =
        serde_json::from_str(&row.try_get::<String, _>("records_json").map_err(ser)?)
            .map_err(ser)?;
    let questions: Vec<Question> =
        serde_json::from_str(&row.try_get::<String, _>("questions_json").map_err(ser)?)
            .map_err(ser)?;

    let meta = ExamResultMeta {
        session_id,
        mode,
        profile,
        target_count: u32_from_i64(
            "target_count",
            row.try_get::<i64, _>("target_count").map_err(ser)?,
        )?,
        started_at: row.try_get("started_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        reason,
    };

    ExamResult::from_persisted(
        meta,
        u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
        u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        u32_from_i64(
            "unanswered",
            row.try_get::<i64, _>("unanswered").map_err(ser)?,
        )?,
        records,
        questions,
    )
    .map_err(ser)
}

pub(crate) fn map_result_row_with_id(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ExamResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let result = map_result_row(row)?;
    Ok(ExamResultRow::new(id, result))
}
