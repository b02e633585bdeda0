use clap::{Args, Subcommand};
use sqlx::SqlitePool;

use super::{truncate, OutputFormat};
use jagdlog::config::Config;
use jagdlog::db::{RecordStore, ShotAnalysisRepository, ShotOwner, StoreError, SyncQueueRepository};
use jagdlog::models::{analyze, ChangeAction, ChangeRecord, ShotObservation, SyncTable};

#[derive(Args)]
pub struct ShotCommand {
    #[command(subcommand)]
    pub command: ShotSubcommand,
}

#[derive(Subcommand)]
pub enum ShotSubcommand {
    /// Assess a shot from what was observed at the site
    Analyze {
        /// Shot distance in metres
        #[arg(long)]
        distance: Option<f64>,

        /// Direction the animal fled
        #[arg(long)]
        direction: Option<String>,

        /// Reaction to the shot (e.g. zusammengebrochen, flüchtig)
        #[arg(long)]
        reaction: Option<String>,

        /// Blood colour (hell-rot, dunkel-rot, wässrig)
        #[arg(long)]
        blood_color: Option<String>,

        /// Blood amount (viel, mittel, wenig)
        #[arg(long)]
        blood_amount: Option<String>,

        /// Blood distribution
        #[arg(long)]
        blood_distribution: Option<String>,

        /// Blood height
        #[arg(long)]
        blood_height: Option<String>,

        /// Store the assessment locally and queue it for sync
        #[arg(long)]
        save: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show recent assessments
    History {
        /// Include assessments of all users
        #[arg(long)]
        all: bool,

        /// Maximum number of assessments
        #[arg(long, short, default_value_t = 20)]
        limit: u32,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ShotCommand {
    /// True for subcommands that change local data.
    pub fn writes(&self) -> bool {
        matches!(self.command, ShotSubcommand::Analyze { save: true, .. })
    }

    pub async fn run(
        &self,
        pool: &SqlitePool,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let repo = ShotAnalysisRepository::new(pool.clone());

        match &self.command {
            ShotSubcommand::Analyze {
                distance,
                direction,
                reaction,
                blood_color,
                blood_amount,
                blood_distribution,
                blood_height,
                save,
                format,
            } => {
                let observation = ShotObservation {
                    distance: *distance,
                    direction: direction.clone(),
                    wild_reaction: reaction.clone(),
                    blood_color: blood_color.clone(),
                    blood_amount: blood_amount.clone(),
                    blood_distribution: blood_distribution.clone(),
                    blood_height: blood_height.clone(),
                };
                let assessment = analyze(&observation);

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&assessment)?);
                    }
                    OutputFormat::Text => println!("{}", assessment),
                }

                if *save {
                    let owner = ShotOwner {
                        revier_id: config.revier_id.value.clone(),
                        user_id: config.user_id.value.clone(),
                    };
                    let recorded = repo.record(&observation, &assessment, &owner).await?;
                    queue_recorded(pool, &[
                        (SyncTable::Entries, recorded.eintrag_id.as_str()),
                        (SyncTable::ShotAnalyses, recorded.analysis_id.as_str()),
                    ])
                    .await?;
                    println!("\nSaved analysis {} (queued for sync).", recorded.analysis_id);
                }
                Ok(())
            }

            ShotSubcommand::History { all, limit, format } => {
                let user = if *all {
                    None
                } else {
                    Some(config.user_id.value.as_str())
                };
                let analyses = repo.history(user, *limit).await?;

                if analyses.is_empty() {
                    println!("No analyses found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&analyses)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<24}  {:<14}  {:<6}  {:<8}  {:<4}  WILDART",
                            "DATUM", "TREFFER", "KONF.", "WARTEN", "HUND"
                        );
                        println!("{}", "-".repeat(80));
                        for a in &analyses {
                            println!(
                                "{:<24}  {:<14}  {:<6}  {:<8}  {:<4}  {}",
                                a.created_at,
                                truncate(a.hit_zone.as_deref().unwrap_or("-"), 14),
                                a.confidence
                                    .map(|c| format!("{:.0}%", c * 100.0))
                                    .unwrap_or_else(|| "-".to_string()),
                                a.wait_time_optimal
                                    .map(|w| format!("{} min", w))
                                    .unwrap_or_else(|| "-".to_string()),
                                if a.dog_required { "ja" } else { "nein" },
                                a.wildart.as_deref().unwrap_or("-"),
                            );
                        }
                        println!("\nTotal: {} analys{}", analyses.len(), if analyses.len() == 1 { "is" } else { "es" });
                    }
                }
                Ok(())
            }
        }
    }
}

/// Queues freshly written rows as creates so the next sync pushes them.
async fn queue_recorded(pool: &SqlitePool, rows: &[(SyncTable, &str)]) -> Result<(), StoreError> {
    let store = RecordStore::new(pool.clone());
    let queue = SyncQueueRepository::new(pool.clone());
    for (table, id) in rows {
        if let Some(row) = store.get(*table, id).await? {
            queue
                .enqueue(&ChangeRecord::new(ChangeAction::Create, table.as_str(), *id, row))
                .await?;
        }
    }
    Ok(())
}
