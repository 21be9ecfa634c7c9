use async_trait::async_trait;
use quiz_core::model::{Attempt, AttemptId, UserId};

use super::SqliteRepository;
use super::mapping::{
    attempt_columns, attempt_id_from_i64, attempt_id_to_i64, map_attempt_row, map_attempt_rows,
};
use crate::repository::{AttemptRepository, StorageError};

const SELECT_ATTEMPT: &str = r"
    SELECT
        id, user_id, timestamp, current_question_index,
        score, answers, is_complete
    FROM quiz_attempts
";

#[async_trait]
impl AttemptRepository for SqliteRepository {
    async fn create(&self, attempt: &Attempt) -> Result<AttemptId, StorageError> {
        if let Some(existing) = attempt.id() {
            return Err(StorageError::Conflict(format!(
                "attempt already persisted as {existing}"
            )));
        }
        let cols = attempt_columns(attempt)?;

        let res = sqlx::query(
            r"
                INSERT INTO quiz_attempts (
                    user_id, timestamp, current_question_index,
                    score, answers, is_complete
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(&cols.user_id)
        .bind(cols.timestamp)
        .bind(cols.current_question_index)
        .bind(cols.score)
        .bind(&cols.answers)
        .bind(cols.is_complete)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

        let id = attempt_id_from_i64(res.last_insert_rowid())?;
        tracing::debug!(%id, user_id = %attempt.user_id(), "created attempt");
        Ok(id)
    }

    async fn update(&self, attempt: &Attempt) -> Result<(), StorageError> {
        let id = attempt.id().ok_or(StorageError::NotFound)?;
        let cols = attempt_columns(attempt)?;

        let res = sqlx::query(
            r"
                UPDATE quiz_attempts SET
                    user_id = ?1,
                    timestamp = ?2,
                    current_question_index = ?3,
                    score = ?4,
                    answers = ?5,
                    is_complete = ?6
                WHERE id = ?7
            ",
        )
        .bind(&cols.user_id)
        .bind(cols.timestamp)
        .bind(cols.current_question_index)
        .bind(cols.score)
        .bind(&cols.answers)
        .bind(cols.is_complete)
        .bind(attempt_id_to_i64(id)?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        tracing::debug!(%id, index = attempt.current_question_index(), "updated attempt");
        Ok(())
    }

    async fn get(&self, id: AttemptId) -> Result<Attempt, StorageError> {
        let sql = format!("{SELECT_ATTEMPT} WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(attempt_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Attempt>, StorageError> {
        let sql = format!("{SELECT_ATTEMPT} WHERE user_id = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(map_attempt_rows(&rows))
    }

    async fn latest_incomplete(&self, user_id: &UserId) -> Result<Option<Attempt>, StorageError> {
        let sql = format!(
            "{SELECT_ATTEMPT} WHERE user_id = ?1 AND is_complete = 0 \
             ORDER BY timestamp DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // Rows are newest first; the first decodable one wins.
        Ok(map_attempt_rows(&rows).into_iter().next())
    }
}
