use serde_json::Value;
use sqlx::SqlitePool;

use super::rows::{bind_json, is_identifier, row_to_payload};
use super::StoreError;
use crate::models::{Payload, SyncTable};
use crate::timestamp;

/// Columns compared as timestamps; stored in the normalized form.
const TIMESTAMP_COLUMNS: [&str; 3] = ["erstellt_am", "aktualisiert_am", "geloescht_am"];

/// Generic row access for the tracked tables.
///
/// Rows are addressed by `(table, id)` and read or written as JSON payloads,
/// so the sync layer never needs to know a table's columns.
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert-or-update keyed by `record_id`.
    ///
    /// Every payload key is written as a column, overwriting what is stored.
    /// Columns absent from the payload keep their current values, so applying
    /// the same payload twice leaves the row unchanged. Parseable timestamp
    /// columns are stored as [`timestamp::format`] produces them.
    pub async fn upsert(
        &self,
        table: SyncTable,
        record_id: &str,
        payload: &Payload,
    ) -> Result<(), StoreError> {
        match payload.get("id") {
            None => {}
            Some(Value::String(id)) if id == record_id => {}
            Some(other) => {
                return Err(StoreError::InvalidChange(format!(
                    "payload id {} does not match record_id '{}'",
                    other, record_id
                )))
            }
        }

        let columns: Vec<&str> = payload
            .keys()
            .map(String::as_str)
            .filter(|column| *column != "id")
            .collect();
        if let Some(bad) = columns.iter().find(|column| !is_identifier(column)) {
            return Err(StoreError::InvalidChange(format!(
                "invalid column name '{}'",
                bad
            )));
        }

        let names: Vec<String> = std::iter::once("id")
            .chain(columns.iter().copied())
            .map(|column| format!("\"{}\"", column))
            .collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        let on_conflict = if columns.is_empty() {
            "DO NOTHING".to_string()
        } else {
            let assignments: Vec<String> = columns
                .iter()
                .map(|column| format!("\"{0}\" = excluded.\"{0}\"", column))
                .collect();
            format!("DO UPDATE SET {}", assignments.join(", "))
        };

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) {}",
            table,
            names.join(", "),
            placeholders,
            on_conflict
        );

        let mut query = sqlx::query(&sql).bind(record_id.to_string());
        for column in &columns {
            query = match &payload[*column] {
                Value::String(raw) if TIMESTAMP_COLUMNS.contains(column) => {
                    query.bind(timestamp::normalize(raw).unwrap_or_else(|| raw.clone()))
                }
                value => bind_json(query, value),
            };
        }
        query.execute(&self.pool).await?;

        Ok(())
    }

    /// Tombstones a row: sets `geloescht_am` and bumps `aktualisiert_am` to `at`.
    ///
    /// Returns false when no row has that id; this is not an error.
    pub async fn soft_delete(
        &self,
        table: SyncTable,
        record_id: &str,
        at: &str,
    ) -> Result<bool, StoreError> {
        let sql = format!(
            "UPDATE {} SET geloescht_am = ?, aktualisiert_am = ? WHERE id = ?",
            table
        );
        let result = sqlx::query(&sql)
            .bind(at)
            .bind(at)
            .bind(record_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, table: SyncTable, record_id: &str) -> Result<Option<Payload>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", table);
        let row = sqlx::query(&sql)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_payload).transpose()?)
    }

    /// Rows created or updated after `since` (all rows when `None`),
    /// newest first, at most `limit` when one is given. Tombstoned rows are
    /// included.
    pub async fn changed_since(
        &self,
        table: SyncTable,
        since: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Payload>, StoreError> {
        // SQLite treats a negative LIMIT as no limit.
        let limit = limit.map_or(-1, i64::from);
        let rows = match since {
            Some(since) => {
                let since = timestamp::normalize(since).unwrap_or_else(|| since.to_string());
                let sql = format!(
                    "SELECT * FROM {} WHERE aktualisiert_am > ? OR erstellt_am > ? ORDER BY erstellt_am DESC LIMIT ?",
                    table
                );
                sqlx::query(&sql)
                    .bind(since.clone())
                    .bind(since)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT * FROM {} ORDER BY erstellt_am DESC LIMIT ?", table);
                sqlx::query(&sql)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter()
            .map(|row| row_to_payload(row).map_err(StoreError::from))
            .collect()
    }

    /// Rows without a tombstone, newest first.
    pub async fn list_live(&self, table: SyncTable, limit: u32) -> Result<Vec<Payload>, StoreError> {
        let sql = format!(
            "SELECT * FROM {} WHERE geloescht_am IS NULL ORDER BY erstellt_am DESC LIMIT ?",
            table
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row_to_payload(row).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{test_db, TestDb};
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().unwrap().clone()
    }

    async fn setup() -> (TestDb, RecordStore) {
        let db = test_db().await;
        let store = RecordStore::new(db.pool.clone());
        (db, store)
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_overwrites() {
        let (_db, store) = setup().await;

        store
            .upsert(
                SyncTable::Entries,
                "E1",
                &payload(json!({"id": "E1", "wildart_name": "Reh", "anzahl": 1})),
            )
            .await
            .unwrap();
        store
            .upsert(
                SyncTable::Entries,
                "E1",
                &payload(json!({"wildart_name": "Rotwild"})),
            )
            .await
            .unwrap();

        let row = store.get(SyncTable::Entries, "E1").await.unwrap().unwrap();
        assert_eq!(row["wildart_name"], json!("Rotwild"));
        assert_eq!(row["anzahl"], json!(1));
    }

    #[tokio::test]
    async fn test_upsert_twice_leaves_same_row() {
        let (_db, store) = setup().await;
        let change = payload(json!({
            "id": "E1",
            "wildart_name": "Reh",
            "erstellt_am": "2025-01-01T10:00:00Z"
        }));

        store.upsert(SyncTable::Entries, "E1", &change).await.unwrap();
        let first = store.get(SyncTable::Entries, "E1").await.unwrap();
        store.upsert(SyncTable::Entries, "E1", &change).await.unwrap();
        let second = store.get(SyncTable::Entries, "E1").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_upsert_rejects_mismatched_id() {
        let (_db, store) = setup().await;

        let err = store
            .upsert(SyncTable::Entries, "E1", &payload(json!({"id": "E2"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidChange(_)));
    }

    #[tokio::test]
    async fn test_upsert_rejects_bad_column_names() {
        let (_db, store) = setup().await;

        let err = store
            .upsert(
                SyncTable::Entries,
                "E1",
                &payload(json!({"notizen) VALUES ('x'); --": "x"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidChange(_)));
    }

    #[tokio::test]
    async fn test_upsert_unknown_column_is_database_error() {
        let (_db, store) = setup().await;

        let err = store
            .upsert(SyncTable::Entries, "E1", &payload(json!({"no_such_column": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn test_soft_delete_sets_tombstone_and_bumps_update() {
        let (_db, store) = setup().await;
        store
            .upsert(
                SyncTable::MapFeatures,
                "F1",
                &payload(json!({
                    "name": "Hochsitz Eiche",
                    "erstellt_am": "2025-01-01T00:00:00.000Z",
                    "aktualisiert_am": "2025-01-01T00:00:00.000Z"
                })),
            )
            .await
            .unwrap();

        let deleted = store
            .soft_delete(SyncTable::MapFeatures, "F1", "2025-03-01T12:00:00.000Z")
            .await
            .unwrap();
        assert!(deleted);

        let row = store.get(SyncTable::MapFeatures, "F1").await.unwrap().unwrap();
        assert_eq!(row["geloescht_am"], json!("2025-03-01T12:00:00.000Z"));
        assert_eq!(row["aktualisiert_am"], json!("2025-03-01T12:00:00.000Z"));
        assert_eq!(row["name"], json!("Hochsitz Eiche"));
    }

    #[tokio::test]
    async fn test_soft_delete_missing_row_is_noop() {
        let (_db, store) = setup().await;

        let deleted = store
            .soft_delete(SyncTable::Media, "missing", "2025-03-01T12:00:00.000Z")
            .await
            .unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_changed_since_checks_both_timestamps() {
        let (_db, store) = setup().await;
        for (id, created, updated) in [
            ("old", "2024-01-01T00:00:00.000Z", "2024-01-01T00:00:00.000Z"),
            ("edited", "2024-01-01T00:00:00.000Z", "2025-02-01T00:00:00.000Z"),
            ("new", "2025-02-01T00:00:00.000Z", "2025-02-01T00:00:00.000Z"),
        ] {
            store
                .upsert(
                    SyncTable::TrackingData,
                    id,
                    &payload(json!({"erstellt_am": created, "aktualisiert_am": updated})),
                )
                .await
                .unwrap();
        }

        let rows = store
            .changed_since(SyncTable::TrackingData, Some("2025-01-01T00:00:00.000Z"), Some(100))
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["new", "edited"]);

        let all = store
            .changed_since(SyncTable::TrackingData, None, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_changed_since_respects_limit_newest_first() {
        let (_db, store) = setup().await;
        for day in 1..=5 {
            store
                .upsert(
                    SyncTable::Entries,
                    &format!("E{}", day),
                    &payload(json!({"erstellt_am": format!("2025-01-0{}T00:00:00.000Z", day)})),
                )
                .await
                .unwrap();
        }

        let rows = store
            .changed_since(SyncTable::Entries, None, Some(2))
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["E5", "E4"]);
    }

    #[tokio::test]
    async fn test_changed_since_compares_instants_not_strings() {
        let (_db, store) = setup().await;
        store
            .upsert(
                SyncTable::Entries,
                "E1",
                &payload(json!({
                    "erstellt_am": "2025-01-01T09:00:00Z",
                    "aktualisiert_am": "2025-01-01T10:00:00.500Z"
                })),
            )
            .await
            .unwrap();

        let row = store.get(SyncTable::Entries, "E1").await.unwrap().unwrap();
        assert_eq!(row["erstellt_am"], json!("2025-01-01T09:00:00.000Z"));

        let rows = store
            .changed_since(SyncTable::Entries, Some("2025-01-01T10:00:00Z"), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let rows = store
            .changed_since(SyncTable::Entries, Some("2025-01-01T12:00:01+02:00"), None)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_list_live_skips_tombstones() {
        let (_db, store) = setup().await;
        store
            .upsert(SyncTable::Entries, "keep", &payload(json!({"wildart_name": "Reh"})))
            .await
            .unwrap();
        store
            .upsert(SyncTable::Entries, "gone", &payload(json!({"wildart_name": "Fuchs"})))
            .await
            .unwrap();
        store
            .soft_delete(SyncTable::Entries, "gone", &crate::timestamp::now())
            .await
            .unwrap();

        let rows = store.list_live(SyncTable::Entries, 50).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("keep"));
    }
}
