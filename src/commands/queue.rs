use clap::{Args, Subcommand};
use sqlx::SqlitePool;
use std::str::FromStr;

use super::{truncate, OutputFormat};
use jagdlog::db::{QueueStatus, SyncQueueRepository};

#[derive(Args)]
pub struct QueueCommand {
    #[command(subcommand)]
    pub command: QueueSubcommand,
}

#[derive(Subcommand)]
pub enum QueueSubcommand {
    /// List queued changes
    List {
        /// Only show items with this status (pending, completed, failed)
        #[arg(long, short)]
        status: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Move failed items back to pending
    Retry,
}

impl QueueCommand {
    pub async fn run(&self, pool: &SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
        let queue = SyncQueueRepository::new(pool.clone());

        match &self.command {
            QueueSubcommand::List { status, format } => {
                let status = status.as_deref().map(QueueStatus::from_str).transpose()?;
                let items = queue.list(status).await?;

                if items.is_empty() {
                    println!("Queue is empty");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&items)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<36}  {:<9}  {:<6}  {:<14}  {:<10}  {:<3}  ERROR",
                            "ID", "STATUS", "ACTION", "TABLE", "RECORD", "TRY"
                        );
                        println!("{}", "-".repeat(110));
                        for item in &items {
                            println!(
                                "{:<36}  {:<9}  {:<6}  {:<14}  {:<10}  {:<3}  {}",
                                item.id,
                                item.status.as_str(),
                                item.action,
                                item.table_name,
                                truncate(&item.record_id, 10),
                                item.attempts,
                                item.error_message.as_deref().unwrap_or(""),
                            );
                        }
                        let counts = queue.counts().await?;
                        println!(
                            "\nPending: {}  Completed: {}  Failed: {}",
                            counts.pending, counts.completed, counts.failed
                        );
                    }
                }
                Ok(())
            }

            QueueSubcommand::Retry => {
                let requeued = queue.retry_failed().await?;
                println!("Re-queued {} failed item(s).", requeued);
                Ok(())
            }
        }
    }
}
