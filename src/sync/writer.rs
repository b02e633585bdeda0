//! Local writes that are queued for the next push.

use serde_json::Value;
use sqlx::SqlitePool;

use super::classifier;
use crate::db::{QueueItem, RecordStore, StoreError, SyncQueueRepository};
use crate::models::{ChangeAction, ChangeRecord, Payload, SyncTable};
use crate::timestamp;

/// Applies a change to the local database and queues it for the server.
pub struct ChangeWriter {
    store: RecordStore,
    queue: SyncQueueRepository,
}

impl ChangeWriter {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            store: RecordStore::new(pool.clone()),
            queue: SyncQueueRepository::new(pool),
        }
    }

    /// Stamps `payload` with the row id and change times, writes it locally and
    /// queues the same change. Creates set `erstellt_am` unless given; every
    /// write sets `aktualisiert_am` so the server hands it to other clients.
    pub async fn write(
        &self,
        action: ChangeAction,
        table: SyncTable,
        record_id: &str,
        mut payload: Payload,
    ) -> Result<QueueItem, StoreError> {
        let now = timestamp::now();
        match action {
            ChangeAction::Create => {
                payload.insert("id".to_string(), Value::String(record_id.to_string()));
                payload
                    .entry("erstellt_am")
                    .or_insert_with(|| Value::String(now.clone()));
                payload.insert("aktualisiert_am".to_string(), Value::String(now));
            }
            ChangeAction::Update => {
                payload.insert("aktualisiert_am".to_string(), Value::String(now));
            }
            ChangeAction::Delete => payload.clear(),
        }

        let change = ChangeRecord::new(action, table.as_str(), record_id, payload);
        classifier::apply(&self.store, &change).await?;
        let item = self.queue.enqueue(&change).await?;
        tracing::debug!(%table, record_id, %action, queue_id = %item.id, "queued local change");
        Ok(item)
    }
}
