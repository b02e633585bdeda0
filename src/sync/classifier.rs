//! Decides what a change does to the store and applies it.

use std::str::FromStr;

use crate::db::{RecordStore, StoreError};
use crate::models::{ChangeAction, ChangeRecord, Payload, SyncTable};
use crate::timestamp;

/// The write a change turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteEffect<'a> {
    /// Insert or overwrite the payload columns of `record_id`.
    Upsert {
        table: SyncTable,
        record_id: &'a str,
        payload: &'a Payload,
    },
    /// Tombstone `record_id`; the payload is ignored.
    SoftDelete {
        table: SyncTable,
        record_id: &'a str,
    },
}

pub fn classify(change: &ChangeRecord) -> Result<WriteEffect<'_>, StoreError> {
    let action = ChangeAction::from_str(&change.action).map_err(StoreError::InvalidChange)?;
    let table = SyncTable::from_str(&change.table_name).map_err(StoreError::InvalidChange)?;
    if change.record_id.is_empty() {
        return Err(StoreError::InvalidChange("record_id is empty".to_string()));
    }

    Ok(match action {
        ChangeAction::Create | ChangeAction::Update => WriteEffect::Upsert {
            table,
            record_id: &change.record_id,
            payload: &change.payload,
        },
        ChangeAction::Delete => WriteEffect::SoftDelete {
            table,
            record_id: &change.record_id,
        },
    })
}

/// Classifies `change` and writes it to `store`.
///
/// Deletes are stamped with the current instant. Deleting a row that does
/// not exist succeeds without effect.
pub async fn apply(store: &RecordStore, change: &ChangeRecord) -> Result<(), StoreError> {
    match classify(change)? {
        WriteEffect::Upsert {
            table,
            record_id,
            payload,
        } => store.upsert(table, record_id, payload).await,
        WriteEffect::SoftDelete { table, record_id } => {
            let found = store
                .soft_delete(table, record_id, &timestamp::now())
                .await?;
            if !found {
                tracing::debug!(%table, record_id, "delete for unknown record ignored");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_db;
    use serde_json::json;

    fn change(action: &str, table: &str, payload: serde_json::Value) -> ChangeRecord {
        ChangeRecord {
            id: None,
            action: action.to_string(),
            table_name: table.to_string(),
            record_id: "R1".to_string(),
            payload: payload.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn test_create_and_update_are_upserts() {
        for action in ["create", "update"] {
            let c = change(action, "eintraege", json!({"wildart_name": "Reh"}));
            match classify(&c).unwrap() {
                WriteEffect::Upsert {
                    table, record_id, ..
                } => {
                    assert_eq!(table, SyncTable::Entries);
                    assert_eq!(record_id, "R1");
                }
                other => panic!("unexpected effect {:?}", other),
            }
        }
    }

    #[test]
    fn test_delete_is_soft_delete() {
        let c = change("delete", "medien", json!({"ignored": true}));
        assert_eq!(
            classify(&c).unwrap(),
            WriteEffect::SoftDelete {
                table: SyncTable::Media,
                record_id: "R1"
            }
        );
    }

    #[test]
    fn test_unknown_action_or_table_is_invalid() {
        let bad_action = change("merge", "eintraege", json!({}));
        assert!(matches!(
            classify(&bad_action),
            Err(StoreError::InvalidChange(_))
        ));

        let bad_table = change("update", "users", json!({}));
        assert!(matches!(
            classify(&bad_table),
            Err(StoreError::InvalidChange(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_delete_ignores_payload_and_missing_rows() {
        let db = test_db().await;
        let store = RecordStore::new(db.pool.clone());

        apply(&store, &change("delete", "eintraege", json!({"bogus": 1})))
            .await
            .unwrap();
        assert!(store.get(SyncTable::Entries, "R1").await.unwrap().is_none());

        apply(&store, &change("create", "eintraege", json!({"wildart_name": "Reh"})))
            .await
            .unwrap();
        apply(&store, &change("delete", "eintraege", json!({})))
            .await
            .unwrap();

        let row = store.get(SyncTable::Entries, "R1").await.unwrap().unwrap();
        assert!(row["geloescht_am"].is_string());
        assert_eq!(row["wildart_name"], json!("Reh"));
    }
}
