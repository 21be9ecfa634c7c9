use quiz_core::model::{AnswerRecord, Attempt, AttemptId, UserId};
use quiz_core::time::{from_epoch_millis, to_epoch_millis};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    u64::try_from(v)
        .map(AttemptId::new)
        .map_err(|_| StorageError::Serialization("attempt id sign overflow".into()))
}

pub(crate) fn attempt_id_to_i64(id: AttemptId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("attempt id overflow".into()))
}

/// Column values for an attempt, in insert/update bind order.
pub(crate) struct AttemptColumns {
    pub user_id: String,
    pub timestamp: i64,
    pub current_question_index: i64,
    pub score: i64,
    pub answers: String,
    pub is_complete: bool,
}

pub(crate) fn attempt_columns(attempt: &Attempt) -> Result<AttemptColumns, StorageError> {
    Ok(AttemptColumns {
        user_id: attempt.user_id().as_str().to_owned(),
        timestamp: to_epoch_millis(attempt.timestamp()),
        current_question_index: i64::from(attempt.current_question_index()),
        score: i64::from(attempt.score()),
        answers: serde_json::to_string(attempt.answers()).map_err(ser)?,
        is_complete: attempt.is_complete(),
    })
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<Attempt, StorageError> {
    let id = attempt_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let user_id = UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?).map_err(ser)?;

    let millis: i64 = row.try_get("timestamp").map_err(ser)?;
    let timestamp = from_epoch_millis(millis)
        .ok_or_else(|| StorageError::Serialization(format!("invalid timestamp: {millis}")))?;

    let current_question_index = u32_from_i64(
        "current_question_index",
        row.try_get::<i64, _>("current_question_index")
            .map_err(ser)?,
    )?;
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;

    let answers_json: String = row.try_get("answers").map_err(ser)?;
    let answers: Vec<AnswerRecord> = serde_json::from_str(&answers_json).map_err(ser)?;

    let is_complete: bool = row.try_get("is_complete").map_err(ser)?;

    Attempt::from_persisted(
        Some(id),
        user_id,
        timestamp,
        current_question_index,
        score,
        answers,
        is_complete,
    )
    .map_err(ser)
}

/// Map rows, dropping any that fail to decode.
pub(crate) fn map_attempt_rows(rows: &[sqlx::sqlite::SqliteRow]) -> Vec<Attempt> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match map_attempt_row(row) {
            Ok(attempt) => out.push(attempt),
            Err(err) => {
                let id = row.try_get::<i64, _>("id").ok();
                tracing::warn!(?id, error = %err, "skipping malformed attempt row");
            }
        }
    }
    out
}
