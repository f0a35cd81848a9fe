use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs versioned migrations for the exam schema.
///
/// Version 1 creates the scored results table and the local question bank.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS exam_results (
                    id INTEGER PRIMARY KEY,
                    session_id TEXT NOT NULL UNIQUE,
                    mode TEXT NOT NULL,
                    role TEXT NOT NULL,
                    area TEXT NOT NULL,
                    competency TEXT,
                    target_count INTEGER NOT NULL CHECK (target_count > 0),
                    started_at TEXT NOT NULL,
                    completed_at TEXT NOT NULL,
                    reason TEXT NOT NULL,
                    total INTEGER NOT NULL CHECK (total >= 0),
                    correct INTEGER NOT NULL CHECK (correct >= 0),
                    unanswered INTEGER NOT NULL CHECK (unanswered >= 0),
                    records_json TEXT NOT NULL,
                    questions_json TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS question_bank (
                    seq INTEGER PRIMARY KEY,
                    question_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    area TEXT NOT NULL,
                    competency TEXT NOT NULL,
                    difficulty TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (question_id, role, area)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_exam_results_profile_completed
                    ON exam_results (role, area, completed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_question_bank_profile
                    ON question_bank (role, area, competency, seq);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
