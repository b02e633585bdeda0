//! Sync after local writes when `sync.auto_sync` is enabled.

use sqlx::SqlitePool;

use jagdlog::config::Config;
use jagdlog::sync::{SyncClient, SyncEngine};

/// Runs one sync round if auto-sync is enabled and the server answers.
///
/// Failures only print a note; local writes are already queued and go out
/// with the next successful sync.
pub async fn try_auto_sync(pool: &SqlitePool, config: &Config) {
    if !config.sync.auto_sync || !config.sync.is_configured() {
        return;
    }

    let client = match SyncClient::from_config(&config.sync) {
        Ok(client) => client,
        Err(_) => return,
    };

    // Check server reachability first (fast fail)
    if !client.check_server().await {
        eprintln!("Auto-sync: server unreachable, skipping");
        return;
    }

    let engine = SyncEngine::new(pool.clone(), client)
        .with_retention_days(config.sync.queue_retention_days);
    match engine.perform_sync().await {
        Ok(report) if report.errors.is_empty() => {
            tracing::debug!(pushed = report.pushed, pulled = report.pulled, "auto-sync done")
        }
        Ok(report) => eprintln!("Auto-sync: {} error(s), see `jagdlog queue list`", report.errors.len()),
        Err(e) => eprintln!("Auto-sync failed: {}", e),
    }
}
