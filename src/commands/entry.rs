use clap::{Args, Subcommand};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::io::{self, Write};
use uuid::Uuid;

use super::{field, truncate, OutputFormat};
use jagdlog::config::Config;
use jagdlog::db::RecordStore;
use jagdlog::models::{ChangeAction, Payload, SyncTable};
use jagdlog::sync::ChangeWriter;
use jagdlog::timestamp;

#[derive(Args)]
pub struct EntryCommand {
    #[command(subcommand)]
    pub command: EntrySubcommand,
}

#[derive(Subcommand)]
pub enum EntrySubcommand {
    /// Record a new entry
    Add {
        /// Species (e.g. Reh, Rotwild, Schwarzwild)
        wildart: String,

        /// Entry type
        #[arg(long, default_value = "beobachtung")]
        typ: String,

        /// Number of animals
        #[arg(long, default_value_t = 1)]
        anzahl: i64,

        /// When it happened (RFC 3339, defaults to now)
        #[arg(long)]
        zeitpunkt: Option<String>,

        /// Latitude
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List entries that are not deleted
    List {
        /// Maximum number of entries
        #[arg(long, short, default_value_t = 20)]
        limit: u32,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete an entry
    Delete {
        /// Entry ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl EntryCommand {
    /// True for subcommands that change local data.
    pub fn writes(&self) -> bool {
        !matches!(self.command, EntrySubcommand::List { .. })
    }

    pub async fn run(
        &self,
        pool: &SqlitePool,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let writer = ChangeWriter::new(pool.clone());
        let store = RecordStore::new(pool.clone());

        match &self.command {
            EntrySubcommand::Add {
                wildart,
                typ,
                anzahl,
                zeitpunkt,
                lat,
                lon,
                notes,
            } => {
                if wildart.trim().is_empty() {
                    return Err("Species cannot be empty".into());
                }
                if *anzahl < 1 {
                    return Err("Count must be at least 1".into());
                }
                let zeitpunkt = match zeitpunkt {
                    Some(value) => {
                        chrono::DateTime::parse_from_rfc3339(value)
                            .map_err(|e| format!("Invalid zeitpunkt '{}': {}", value, e))?;
                        value.clone()
                    }
                    None => timestamp::now(),
                };

                let id = Uuid::new_v4().to_string();
                let payload = entry_payload(
                    config,
                    wildart.trim(),
                    typ,
                    *anzahl,
                    &zeitpunkt,
                    lat.zip(*lon),
                    notes.as_deref(),
                );
                writer
                    .write(ChangeAction::Create, SyncTable::Entries, &id, payload)
                    .await?;

                println!("Created entry: {}", id);
                println!("  {} x{} ({}) at {}", wildart.trim(), anzahl, typ, zeitpunkt);
                println!("Queued for sync.");
                Ok(())
            }

            EntrySubcommand::List { limit, format } => {
                let entries = store.list_live(SyncTable::Entries, *limit).await?;

                if entries.is_empty() {
                    println!("No entries found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<36}  {:<24}  {:<16}  {:<5}  TYP",
                            "ID", "ZEITPUNKT", "WILDART", "ANZ"
                        );
                        println!("{}", "-".repeat(100));
                        for entry in &entries {
                            println!(
                                "{:<36}  {:<24}  {:<16}  {:<5}  {}",
                                field(entry, "id"),
                                field(entry, "zeitpunkt"),
                                truncate(&field(entry, "wildart_name"), 16),
                                field(entry, "anzahl"),
                                field(entry, "typ"),
                            );
                        }
                        println!("\nTotal: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
                    }
                }
                Ok(())
            }

            EntrySubcommand::Delete { id, force } => {
                let entry = match store.get(SyncTable::Entries, id).await? {
                    Some(entry) if entry.get("geloescht_am").is_some_and(|v| !v.is_null()) => {
                        return Err(format!("Entry already deleted: {}", id).into())
                    }
                    Some(entry) => entry,
                    None => return Err(format!("Entry not found: {}", id).into()),
                };

                // Confirm deletion unless --force is used
                if !force {
                    print!("Delete entry '{}' ({})? [y/N] ", id, field(&entry, "wildart_name"));
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                writer
                    .write(ChangeAction::Delete, SyncTable::Entries, id, Payload::new())
                    .await?;
                println!("Deleted entry: {}", id);
                Ok(())
            }
        }
    }
}

fn entry_payload(
    config: &Config,
    wildart: &str,
    typ: &str,
    anzahl: i64,
    zeitpunkt: &str,
    position: Option<(f64, f64)>,
    notes: Option<&str>,
) -> Payload {
    let mut payload = Payload::new();
    payload.insert("revier_id".into(), json!(config.revier_id.value));
    payload.insert("user_id".into(), json!(config.user_id.value));
    payload.insert("erstellt_von".into(), json!(config.user_id.value));
    payload.insert("typ".into(), json!(typ));
    payload.insert("zeitpunkt".into(), json!(zeitpunkt));
    payload.insert("wildart_name".into(), json!(wildart));
    payload.insert("anzahl".into(), json!(anzahl));
    if let Some((lat, lon)) = position {
        payload.insert("gps_lat".into(), json!(lat));
        payload.insert("gps_lon".into(), json!(lon));
    }
    if let Some(notes) = notes {
        payload.insert("notizen".into(), Value::String(notes.to_string()));
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_entry_payload_uses_config_identity() {
        let config = Config::load_with(Some(PathBuf::from("/nonexistent/config.yaml")), |name| {
            match name {
                "JAGDLOG_USER_ID" => Some("jaeger-1".to_string()),
                "JAGDLOG_REVIER_ID" => Some("revier-9".to_string()),
                _ => None,
            }
        })
        .unwrap();

        let payload = entry_payload(
            &config,
            "Reh",
            "abschuss",
            2,
            "2025-01-01T10:00:00.000Z",
            Some((51.5, 7.25)),
            None,
        );

        assert_eq!(payload["user_id"], "jaeger-1");
        assert_eq!(payload["revier_id"], "revier-9");
        assert_eq!(payload["anzahl"], 2);
        assert_eq!(payload["gps_lon"], 7.25);
        assert!(!payload.contains_key("notizen"));
    }
}
