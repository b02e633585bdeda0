mod queue_repo;
mod record_store;
mod rows;
mod settings_repo;
mod shot_repo;

pub use queue_repo::{QueueCounts, QueueItem, QueueStatus, SyncQueueRepository};
pub use record_store::RecordStore;
pub use settings_repo::{SettingsRepository, CHECKPOINT_KEY};
pub use shot_repo::{AnalysisSummary, RecordedAnalysis, ShotAnalysisRepository, ShotOwner};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Errors from the local or server-side store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid change: {0}")]
    InvalidChange(String),

    #[error("invalid stored payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Open (creating if needed) the SQLite database at `path` and run migrations.
///
/// The same schema backs the server and every client.
pub async fn init_db(path: &Path) -> Result<SqlitePool, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!(path = %path.display(), "database ready");
    Ok(pool)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    pub struct TestDb {
        pub pool: SqlitePool,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    pub async fn test_db() -> TestDb {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        TestDb {
            pool,
            _temp_dir: temp_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_db_creates_tables() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        let pool = init_db(&db_path).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        for expected in [
            "eintraege",
            "map_features",
            "medien",
            "settings",
            "shot_analysis",
            "sync_queue",
            "tracking_data",
        ] {
            assert!(table_names.contains(&expected), "missing {}", expected);
        }
    }

    #[tokio::test]
    async fn test_init_db_is_reentrant() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let first = init_db(&db_path).await.unwrap();
        first.close().await;
        init_db(&db_path).await.unwrap();
    }
}
