use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::StoreError;
use crate::models::{ChangeRecord, Payload};
use crate::timestamp;

/// Lifecycle of a queued local change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QueueStatus::Pending),
            "completed" => Ok(QueueStatus::Completed),
            "failed" => Ok(QueueStatus::Failed),
            _ => Err(format!(
                "Invalid queue status '{}'. Valid options: pending, completed, failed",
                s
            )),
        }
    }
}

/// A local change waiting to be pushed (or already pushed).
#[derive(Debug, Clone, Serialize)]
pub struct QueueItem {
    pub id: String,
    pub action: String,
    pub table_name: String,
    pub record_id: String,
    pub payload: Payload,
    pub status: QueueStatus,
    pub attempts: i64,
    pub last_attempt: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
}

impl QueueItem {
    /// Wire form, tagged with the queue id so push results can be matched back.
    pub fn to_change(&self) -> ChangeRecord {
        ChangeRecord {
            id: Some(self.id.clone()),
            action: self.action.clone(),
            table_name: self.table_name.clone(),
            record_id: self.record_id.clone(),
            payload: self.payload.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: i64,
    pub completed: i64,
    pub failed: i64,
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    id: String,
    action: String,
    table_name: String,
    record_id: String,
    payload: String,
    status: String,
    attempts: i64,
    last_attempt: Option<String>,
    error_message: Option<String>,
    created_at: String,
}

impl TryFrom<QueueRow> for QueueItem {
    type Error = StoreError;

    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        let status = QueueStatus::from_str(&row.status).map_err(StoreError::InvalidChange)?;
        Ok(QueueItem {
            id: row.id,
            action: row.action,
            table_name: row.table_name,
            record_id: row.record_id,
            payload: serde_json::from_str(&row.payload)?,
            status,
            attempts: row.attempts,
            last_attempt: row.last_attempt,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}

/// The client-side outbox of changes not yet acknowledged by the server.
pub struct SyncQueueRepository {
    pool: SqlitePool,
}

impl SyncQueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Adds a change to the queue as `pending`. The change's own `id` is
    /// ignored; the queue assigns one.
    pub async fn enqueue(&self, change: &ChangeRecord) -> Result<QueueItem, StoreError> {
        let id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(&change.payload)?;

        sqlx::query(
            r#"
            INSERT INTO sync_queue (id, action, table_name, record_id, payload, status, attempts, created_at)
            VALUES (?, ?, ?, ?, ?, 'pending', 0, ?)
            "#,
        )
        .bind(&id)
        .bind(&change.action)
        .bind(&change.table_name)
        .bind(&change.record_id)
        .bind(&payload)
        .bind(timestamp::now())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            queue_id = %id,
            action = %change.action,
            table = %change.table_name,
            record_id = %change.record_id,
            "queued change"
        );

        self.get(&id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    pub async fn get(&self, id: &str) -> Result<Option<QueueItem>, StoreError> {
        let row: Option<QueueRow> = sqlx::query_as("SELECT * FROM sync_queue WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(QueueItem::try_from).transpose()
    }

    /// Pending items, oldest first.
    pub async fn pending(&self) -> Result<Vec<QueueItem>, StoreError> {
        self.list(Some(QueueStatus::Pending)).await
    }

    pub async fn list(&self, status: Option<QueueStatus>) -> Result<Vec<QueueItem>, StoreError> {
        let rows: Vec<QueueRow> = match status {
            Some(status) => {
                sqlx::query_as(
                    "SELECT * FROM sync_queue WHERE status = ? ORDER BY created_at ASC, rowid ASC",
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM sync_queue ORDER BY created_at ASC, rowid ASC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(QueueItem::try_from).collect()
    }

    pub async fn mark_completed(&self, ids: &[String]) -> Result<(), StoreError> {
        let now = timestamp::now();
        for id in ids {
            sqlx::query(
                "UPDATE sync_queue SET status = 'completed', attempts = attempts + 1, last_attempt = ?, error_message = NULL WHERE id = ?",
            )
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE sync_queue SET status = 'failed', attempts = attempts + 1, last_attempt = ?, error_message = ? WHERE id = ?",
        )
        .bind(timestamp::now())
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Moves every failed item back to pending. Returns how many were re-queued.
    pub async fn retry_failed(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE sync_queue SET status = 'pending' WHERE status = 'failed'")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Deletes completed items created before `before`.
    pub async fn purge_completed(&self, before: &str) -> Result<u64, StoreError> {
        let result =
            sqlx::query("DELETE FROM sync_queue WHERE status = 'completed' AND created_at < ?")
                .bind(before)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn counts(&self) -> Result<QueueCounts, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM sync_queue GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = QueueCounts::default();
        for (status, count) in rows {
            match QueueStatus::from_str(&status) {
                Ok(QueueStatus::Pending) => counts.pending = count,
                Ok(QueueStatus::Completed) => counts.completed = count,
                Ok(QueueStatus::Failed) => counts.failed = count,
                Err(e) => tracing::warn!("{}", e),
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{test_db, TestDb};
    use crate::models::ChangeAction;
    use serde_json::json;

    async fn setup() -> (TestDb, SyncQueueRepository) {
        let db = test_db().await;
        let repo = SyncQueueRepository::new(db.pool.clone());
        (db, repo)
    }

    fn change(record_id: &str) -> ChangeRecord {
        ChangeRecord::new(
            ChangeAction::Create,
            "eintraege",
            record_id,
            json!({"id": record_id, "wildart_name": "Reh"})
                .as_object()
                .unwrap()
                .clone(),
        )
    }

    #[tokio::test]
    async fn test_enqueue_and_pending_in_order() {
        let (_db, repo) = setup().await;

        let first = repo.enqueue(&change("E1")).await.unwrap();
        let second = repo.enqueue(&change("E2")).await.unwrap();

        assert_eq!(first.status, QueueStatus::Pending);
        assert_eq!(first.attempts, 0);

        let pending = repo.pending().await.unwrap();
        let ids: Vec<&str> = pending.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
        assert_eq!(pending[0].payload["wildart_name"], json!("Reh"));
    }

    #[tokio::test]
    async fn test_to_change_carries_queue_id() {
        let (_db, repo) = setup().await;

        let item = repo.enqueue(&change("E1")).await.unwrap();
        let wire = item.to_change();

        assert_eq!(wire.id.as_deref(), Some(item.id.as_str()));
        assert_eq!(wire.ack_id(), item.id);
        assert_eq!(wire.record_id, "E1");
    }

    #[tokio::test]
    async fn test_mark_completed_and_failed() {
        let (_db, repo) = setup().await;
        let ok = repo.enqueue(&change("E1")).await.unwrap();
        let bad = repo.enqueue(&change("E2")).await.unwrap();

        repo.mark_completed(&[ok.id.clone()]).await.unwrap();
        repo.mark_failed(&bad.id, "constraint violation").await.unwrap();

        let bad = repo.get(&bad.id).await.unwrap().unwrap();
        assert_eq!(bad.status, QueueStatus::Failed);
        assert_eq!(bad.attempts, 1);
        assert_eq!(bad.error_message.as_deref(), Some("constraint violation"));
        assert!(bad.last_attempt.is_some());

        assert!(repo.pending().await.unwrap().is_empty());
        assert_eq!(
            repo.counts().await.unwrap(),
            QueueCounts {
                pending: 0,
                completed: 1,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_retry_failed_requeues() {
        let (_db, repo) = setup().await;
        let item = repo.enqueue(&change("E1")).await.unwrap();
        repo.mark_failed(&item.id, "offline").await.unwrap();

        assert_eq!(repo.retry_failed().await.unwrap(), 1);

        let pending = repo.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_purge_completed_only_removes_old_completed() {
        let (_db, repo) = setup().await;
        let done = repo.enqueue(&change("E1")).await.unwrap();
        let waiting = repo.enqueue(&change("E2")).await.unwrap();
        repo.mark_completed(&[done.id.clone()]).await.unwrap();

        assert_eq!(
            repo.purge_completed("2000-01-01T00:00:00.000Z").await.unwrap(),
            0
        );
        assert_eq!(
            repo.purge_completed("9999-01-01T00:00:00.000Z").await.unwrap(),
            1
        );

        assert!(repo.get(&done.id).await.unwrap().is_none());
        assert!(repo.get(&waiting.id).await.unwrap().is_some());
    }

    #[test]
    fn test_queue_status_from_str() {
        assert_eq!(QueueStatus::from_str("failed").unwrap(), QueueStatus::Failed);
        assert!(QueueStatus::from_str("syncing").is_err());
    }
}
