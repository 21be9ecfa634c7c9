use async_trait::async_trait;
use chrono::Utc;
use quiz_core::model::UserId;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{IdentityRepository, StorageError};

#[async_trait]
impl IdentityRepository for SqliteRepository {
    async fn load_user_id(&self) -> Result<Option<UserId>, StorageError> {
        let row = sqlx::query("SELECT user_id FROM local_identity WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row
            .try_get("user_id")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        UserId::new(raw)
            .map(Some)
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    async fn save_user_id(&self, user_id: &UserId) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO local_identity (id, user_id, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id
            ",
        )
        .bind(1_i64)
        .bind(user_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::WriteFailed(err.to_string()))?;

        Ok(())
    }
}
