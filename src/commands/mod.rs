use clap::ValueEnum;

mod auto_sync;
mod config_cmd;
mod entry;
mod profile;
mod queue;
mod shot;
mod sync_cmd;

pub use auto_sync::try_auto_sync;
pub use config_cmd::ConfigCommand;
pub use entry::EntryCommand;
pub use profile::ProfileCommand;
pub use queue::QueueCommand;
pub use shot::ShotCommand;
pub use sync_cmd::SyncCommand;

#[derive(Debug, Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Shortens `value` to `width` characters for table output.
fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() > width {
        let kept: String = value.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        value.to_string()
    }
}

/// Renders an optional payload field for table output.
fn field(payload: &jagdlog::models::Payload, key: &str) -> String {
    match payload.get(key) {
        None | Some(serde_json::Value::Null) => "-".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
