//! Applies a batch of incoming changes, one at a time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::classifier;
use crate::db::RecordStore;
use crate::models::ChangeRecord;

/// A change that could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushError {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushOutcome {
    /// Ids of applied changes, in input order.
    pub processed: Vec<String>,
    pub errors: Vec<PushError>,
}

impl PushOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Applies `changes` in order without a surrounding transaction.
///
/// A failing change is recorded and the rest of the batch still runs, so
/// every input ends up in exactly one of `processed` or `errors`. Retrying
/// failed changes is up to the caller.
pub async fn push(store: &RecordStore, changes: &[ChangeRecord]) -> PushOutcome {
    let mut outcome = PushOutcome::default();
    for change in changes {
        apply_one(store, change, &mut outcome).await;
    }
    log_outcome(&outcome);
    outcome
}

/// Like [`push`], but for changes as they arrived on the wire.
///
/// Each item is decoded on its own; one that is not a valid change is
/// reported under its `id` or `record_id` (or its position when it has
/// neither) and does not affect the others.
pub async fn push_json(store: &RecordStore, items: &[Value]) -> PushOutcome {
    let mut outcome = PushOutcome::default();
    for (index, item) in items.iter().enumerate() {
        match ChangeRecord::deserialize(item) {
            Ok(change) => apply_one(store, &change, &mut outcome).await,
            Err(e) => {
                let id = item_id(item, index);
                tracing::warn!(id = %id, "push change malformed: {}", e);
                outcome.errors.push(PushError {
                    id,
                    error: format!("malformed change: {}", e),
                });
            }
        }
    }
    log_outcome(&outcome);
    outcome
}

fn item_id(item: &Value, index: usize) -> String {
    ["id", "record_id"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("changes[{}]", index))
}

async fn apply_one(store: &RecordStore, change: &ChangeRecord, outcome: &mut PushOutcome) {
    let id = change.ack_id().to_string();
    match classifier::apply(store, change).await {
        Ok(()) => outcome.processed.push(id),
        Err(e) => {
            tracing::warn!(
                id = %id,
                table = %change.table_name,
                record_id = %change.record_id,
                "push change failed: {}",
                e
            );
            outcome.errors.push(PushError {
                id,
                error: e.to_string(),
            });
        }
    }
}

fn log_outcome(outcome: &PushOutcome) {
    tracing::info!(
        processed = outcome.processed.len(),
        failed = outcome.errors.len(),
        "push batch applied"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_db;
    use crate::models::{ChangeAction, Payload, SyncTable};
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().unwrap().clone()
    }

    fn reh_entry() -> ChangeRecord {
        ChangeRecord::new(
            ChangeAction::Create,
            "eintraege",
            "E1",
            payload(json!({
                "id": "E1",
                "wildart_name": "Reh",
                "erstellt_am": "2025-01-01T10:00:00Z"
            })),
        )
    }

    #[tokio::test]
    async fn test_push_reports_record_ids() {
        let db = test_db().await;
        let store = RecordStore::new(db.pool.clone());

        let outcome = push(&store, &[reh_entry()]).await;

        assert_eq!(outcome.processed, vec!["E1".to_string()]);
        assert!(outcome.errors.is_empty());
        let row = store.get(SyncTable::Entries, "E1").await.unwrap().unwrap();
        assert_eq!(row["wildart_name"], json!("Reh"));
    }

    #[tokio::test]
    async fn test_push_continues_after_failures() {
        let db = test_db().await;
        let store = RecordStore::new(db.pool.clone());

        let changes = vec![
            ChangeRecord {
                id: Some("q1".into()),
                action: "create".into(),
                table_name: "users".into(),
                record_id: "U1".into(),
                payload: Payload::new(),
            },
            reh_entry().with_id("q2"),
            ChangeRecord::new(
                ChangeAction::Update,
                "eintraege",
                "E2",
                payload(json!({"not_a_column": 1})),
            )
            .with_id("q3"),
            ChangeRecord::new(ChangeAction::Delete, "eintraege", "E1", Payload::new())
                .with_id("q4"),
        ];

        let outcome = push(&store, &changes).await;

        assert_eq!(outcome.processed, vec!["q2".to_string(), "q4".to_string()]);
        let failed: Vec<&str> = outcome.errors.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(failed, vec!["q1", "q3"]);
        assert_eq!(
            outcome.processed.len() + outcome.errors.len(),
            changes.len()
        );

        let row = store.get(SyncTable::Entries, "E1").await.unwrap().unwrap();
        assert!(row["geloescht_am"].is_string());
    }

    #[tokio::test]
    async fn test_push_same_change_twice_is_idempotent() {
        let db = test_db().await;
        let store = RecordStore::new(db.pool.clone());

        push(&store, &[reh_entry()]).await;
        let once = store.get(SyncTable::Entries, "E1").await.unwrap();
        push(&store, &[reh_entry()]).await;
        let twice = store.get(SyncTable::Entries, "E1").await.unwrap();

        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_push_json_reports_malformed_items_and_applies_the_rest() {
        let db = test_db().await;
        let store = RecordStore::new(db.pool.clone());
        let items = vec![
            serde_json::to_value(reh_entry().with_id("q1")).unwrap(),
            json!({"id": "q2", "action": "update", "table_name": "eintraege", "record_id": "E2", "payload": null}),
            json!({"action": "update", "table_name": "eintraege", "record_id": "E3", "payload": []}),
            json!({"action": "update", "table_name": "eintraege", "record_id": 7}),
            json!("not a change"),
        ];

        let outcome = push_json(&store, &items).await;

        assert_eq!(outcome.processed, vec!["q1".to_string()]);
        let failed: Vec<&str> = outcome.errors.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(failed, vec!["q2", "E3", "changes[3]", "changes[4]"]);
        assert!(outcome.errors[0].error.starts_with("malformed change"));
        assert!(store.get(SyncTable::Entries, "E1").await.unwrap().is_some());
        assert!(store.get(SyncTable::Entries, "E2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let db = test_db().await;
        let store = RecordStore::new(db.pool.clone());

        let outcome = push(&store, &[]).await;
        assert!(outcome.is_clean());
        assert!(outcome.processed.is_empty());
    }
}
