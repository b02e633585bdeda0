//! Push-then-pull sync rounds against a transport.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use super::{classifier, SyncTransport};
use crate::db::{RecordStore, SettingsRepository, StoreError, SyncQueueRepository};
use crate::timestamp;

/// Completed queue items are kept this many days by default.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Result of one sync round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// True iff every queued change was accepted by the server.
    pub success: bool,
    pub pushed: usize,
    pub pulled: usize,
    pub errors: Vec<String>,
    /// Checkpoint stored after the round.
    pub checkpoint: Option<String>,
}

/// Drives sync rounds for one local database.
pub struct SyncEngine<T> {
    pool: SqlitePool,
    transport: T,
    retention: Duration,
}

impl<T: SyncTransport> SyncEngine<T> {
    pub fn new(pool: SqlitePool, transport: T) -> Self {
        Self {
            pool,
            transport,
            retention: Duration::days(i64::from(DEFAULT_RETENTION_DAYS)),
        }
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention = Duration::days(i64::from(days));
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs one round: push pending queue items, pull and apply remote
    /// changes, then advance the checkpoint.
    ///
    /// Transport and per-item failures are reported in the returned
    /// [`SyncReport`]; only local database failures are returned as errors.
    pub async fn perform_sync(&self) -> Result<SyncReport, StoreError> {
        let queue = SyncQueueRepository::new(self.pool.clone());
        let settings = SettingsRepository::new(self.pool.clone());
        let store = RecordStore::new(self.pool.clone());
        let mut report = SyncReport::default();
        let mut push_failed = false;

        let pending = queue.pending().await?;
        if !pending.is_empty() {
            let changes: Vec<_> = pending.iter().map(|item| item.to_change()).collect();
            match self.transport.push(&changes).await {
                Ok(response) => {
                    queue.mark_completed(&response.processed).await?;
                    report.pushed = response.processed.len();
                    for failure in &response.errors {
                        queue.mark_failed(&failure.id, &failure.error).await?;
                        report
                            .errors
                            .push(format!("Push failed for {}: {}", failure.id, failure.error));
                        push_failed = true;
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    for item in &pending {
                        queue.mark_failed(&item.id, &message).await?;
                    }
                    report.errors.push(format!("Push failed: {}", message));
                    push_failed = true;
                }
            }
        }

        let stored = settings.last_sync_timestamp().await?;
        match self.transport.pull(stored.as_deref()).await {
            Ok(response) => {
                let mut clean = response.errors.is_empty();
                for failure in &response.errors {
                    report
                        .errors
                        .push(format!("Pull failed: {}: {}", failure.table, failure.error));
                }

                for change in &response.changes {
                    match classifier::apply(&store, change).await {
                        Ok(()) => report.pulled += 1,
                        Err(e) => {
                            clean = false;
                            report.errors.push(format!(
                                "Apply failed: {} {}: {}",
                                change.table_name, change.record_id, e
                            ));
                        }
                    }
                }

                if clean {
                    let next = match stored.as_deref() {
                        Some(current) => timestamp::latest(current, &response.timestamp),
                        None => response.timestamp.as_str(),
                    };
                    if stored.as_deref() != Some(next) {
                        settings.set_last_sync_timestamp(next).await?;
                    }
                    report.checkpoint = Some(next.to_string());
                } else {
                    report.checkpoint = stored;
                }
            }
            Err(e) => {
                report.errors.push(format!("Pull failed: {}", e));
                report.checkpoint = stored;
            }
        }

        let cutoff = timestamp::format(Utc::now() - self.retention);
        let purged = queue.purge_completed(&cutoff).await?;
        if purged > 0 {
            tracing::debug!(purged, "purged completed queue items");
        }

        report.success = !push_failed;
        tracing::info!(
            success = report.success,
            pushed = report.pushed,
            pulled = report.pulled,
            errors = report.errors.len(),
            "sync round finished"
        );
        Ok(report)
    }
}
