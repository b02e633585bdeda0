//! Collects rows changed since a checkpoint across the tracked tables.

use serde::{Deserialize, Serialize};

use crate::db::RecordStore;
use crate::models::{ChangeAction, ChangeRecord, SyncTable};
use crate::timestamp;

/// Default number of rows per table on the read-only feed.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A table that could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableError {
    pub table: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullOutcome {
    pub changes: Vec<ChangeRecord>,
    pub errors: Vec<TableError>,
    /// New checkpoint for the caller, taken before any table was read.
    pub timestamp: String,
}

/// Reads every row of `tables` changed after `since` (everything when
/// `since` is absent or empty), at most `page_size` rows per table when a
/// page size is given.
///
/// Rows past a page size are not returned and are not covered by the
/// returned timestamp, so a checkpointing caller must pull unpaged.
///
/// Each row comes back as an `update` change whose payload is the full row;
/// tombstoned rows carry `geloescht_am` and the caller decides what to do
/// with them. A table that fails is reported in `errors` and the remaining
/// tables are still read.
pub async fn pull(
    store: &RecordStore,
    since: Option<&str>,
    tables: &[SyncTable],
    page_size: Option<u32>,
) -> PullOutcome {
    let since = since.filter(|s| !s.is_empty());
    let checkpoint = timestamp::now();
    let mut changes = Vec::new();
    let mut errors = Vec::new();

    for &table in tables {
        match store.changed_since(table, since, page_size).await {
            Ok(rows) => {
                if let Some(page_size) = page_size {
                    if rows.len() as u64 >= u64::from(page_size) {
                        tracing::warn!(
                            %table,
                            page_size,
                            "pull hit the page size; older changes were left out"
                        );
                    }
                }
                for row in rows {
                    let record_id = match row.get("id").and_then(|v| v.as_str()) {
                        Some(id) => id.to_string(),
                        None => continue,
                    };
                    changes.push(ChangeRecord::new(
                        ChangeAction::Update,
                        table.as_str(),
                        record_id,
                        row,
                    ));
                }
            }
            Err(e) => {
                tracing::error!(%table, "pull failed: {}", e);
                errors.push(TableError {
                    table: table.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        since = since.unwrap_or("-"),
        changes = changes.len(),
        failed_tables = errors.len(),
        "pull collected changes"
    );

    PullOutcome {
        changes,
        errors,
        timestamp: checkpoint,
    }
}
