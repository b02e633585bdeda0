//! Sync CLI commands for synchronizing with the server.

use clap::{Args, Subcommand};
use sqlx::SqlitePool;
use std::time::Duration;

use super::{field, OutputFormat};
use jagdlog::config::Config;
use jagdlog::db::{SettingsRepository, SyncQueueRepository};
use jagdlog::sync::{SyncClient, SyncEngine, SyncReport};

/// Sync with remote server
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Keep syncing every `sync.interval_secs` until interrupted
    #[arg(long, short)]
    watch: bool,

    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration, queue and server status
    Status,

    /// Print recent server changes without applying them
    Pull {
        /// Only changes after this timestamp
        #[arg(long)]
        since: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl SyncCommand {
    pub async fn run(
        &self,
        pool: &SqlitePool,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None if self.watch => self.watch(pool, config).await,
            None => self.sync_once(pool, config).await,
            Some(SyncSubcommand::Status) => self.status(pool, config).await,
            Some(SyncSubcommand::Pull { since, format }) => {
                self.pull(config, since.as_deref(), format).await
            }
        }
    }

    fn engine(pool: &SqlitePool, config: &Config) -> Result<SyncEngine<SyncClient>, Box<dyn std::error::Error>> {
        let client = SyncClient::from_config(&config.sync)?;
        Ok(SyncEngine::new(pool.clone(), client)
            .with_retention_days(config.sync.queue_retention_days))
    }

    async fn sync_once(
        &self,
        pool: &SqlitePool,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let engine = Self::engine(pool, config)?;

        println!("Syncing with {}...", engine.transport().base_url());
        println!();

        let report = engine.perform_sync().await?;
        print_report(&report);

        if report.success {
            Ok(())
        } else {
            Err("Sync finished with push errors; see `jagdlog queue list --status failed`".into())
        }
    }

    async fn watch(
        &self,
        pool: &SqlitePool,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let engine = Self::engine(pool, config)?;
        let period = Duration::from_secs(config.sync.interval_secs);
        let mut ticker = tokio::time::interval(period);

        println!(
            "Syncing with {} every {}s. Press Ctrl-C to stop.",
            engine.transport().base_url(),
            config.sync.interval_secs
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !engine.transport().check_server().await {
                        tracing::warn!("sync server unreachable, skipping round");
                        continue;
                    }
                    match engine.perform_sync().await {
                        Ok(report) => {
                            println!();
                            print_report(&report);
                        }
                        Err(e) => tracing::error!("sync round failed: {}", e),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("\nStopped.");
                    return Ok(());
                }
            }
        }
    }

    async fn status(
        &self,
        pool: &SqlitePool,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        let counts = SyncQueueRepository::new(pool.clone()).counts().await?;
        let checkpoint = SettingsRepository::new(pool.clone())
            .last_sync_timestamp()
            .await?;

        println!(
            "Last sync: {}",
            checkpoint.as_deref().unwrap_or("never")
        );
        println!(
            "Queue:     {} pending, {} failed, {} completed",
            counts.pending, counts.failed, counts.completed
        );
        println!();

        if !config.sync.is_configured() {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!("    auto_sync: false");
            println!("    interval_secs: 300");
            println!();
            println!("Or set environment variable:");
            println!("  JAGDLOG_SYNC_URL");
            return Ok(());
        }

        let client = SyncClient::from_config(&config.sync)?;
        println!("Server:    {}", client.base_url());
        println!(
            "Auto-sync: {} (every {}s)",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            },
            config.sync.interval_secs
        );
        println!();

        print!("Server status: ");
        if client.check_server().await {
            println!("✓ connected");
        } else {
            println!("✗ unreachable");
        }

        Ok(())
    }

    async fn pull(
        &self,
        config: &Config,
        since: Option<&str>,
        format: &OutputFormat,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let client = SyncClient::from_config(&config.sync)?;
        let feed = client.feed(since).await?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&feed)?);
            }
            OutputFormat::Text => {
                for failure in &feed.errors {
                    eprintln!("warning: {} unavailable: {}", failure.table, failure.error);
                }
                if feed.changes.is_empty() {
                    println!("No changes since {}", since.unwrap_or("the beginning"));
                } else {
                    println!("{:<14}  {:<36}  {:<24}  DELETED", "TABLE", "ID", "UPDATED");
                    println!("{}", "-".repeat(90));
                    for change in &feed.changes {
                        println!(
                            "{:<14}  {:<36}  {:<24}  {}",
                            change.table_name,
                            change.record_id,
                            field(&change.payload, "aktualisiert_am"),
                            if change.tombstone().is_some() { "yes" } else { "" },
                        );
                    }
                    println!("\nTotal: {} change(s)", feed.changes.len());
                }
                println!("Server time: {}", feed.timestamp);
            }
        }
        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    println!("  ✓ pushed {} change(s)", report.pushed);
    println!("  ✓ applied {} remote change(s)", report.pulled);
    for error in &report.errors {
        println!("  ✗ {}", error);
    }
    if let Some(checkpoint) = &report.checkpoint {
        println!("  checkpoint: {}", checkpoint);
    }
    println!();
    if report.errors.is_empty() {
        println!("Sync complete.");
    } else {
        println!("Sync finished with {} error(s).", report.errors.len());
    }
}
