use sqlx::SqlitePool;

use super::StoreError;
use crate::timestamp;

/// Settings key holding the last successfully pulled instant.
pub const CHECKPOINT_KEY: &str = "last_sync_timestamp";

/// Durable key-value settings on the client.
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(timestamp::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn last_sync_timestamp(&self) -> Result<Option<String>, StoreError> {
        self.get(CHECKPOINT_KEY).await
    }

    pub async fn set_last_sync_timestamp(&self, value: &str) -> Result<(), StoreError> {
        self.set(CHECKPOINT_KEY, value).await
    }
}
