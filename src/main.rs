use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    try_auto_sync, ConfigCommand, EntryCommand, ProfileCommand, QueueCommand, ShotCommand,
    SyncCommand,
};
use jagdlog::config::Config;
use jagdlog::db::init_db;

#[derive(Parser)]
#[command(name = "jagdlog")]
#[command(version)]
#[command(about = "Offline-first hunting log with server sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage hunting-log entries
    Entry(EntryCommand),

    /// Assess a shot and review past assessments
    Shot(ShotCommand),

    /// Inspect the local sync queue
    Queue(QueueCommand),

    /// Sync with the server
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),

    /// Inspect client profiles
    Profile(ProfileCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jagdlog=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Entry(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            cmd.run(&pool, &config).await?;
            if cmd.writes() {
                try_auto_sync(&pool, &config).await;
            }
        }
        Some(Commands::Shot(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            cmd.run(&pool, &config).await?;
            if cmd.writes() {
                try_auto_sync(&pool, &config).await;
            }
        }
        Some(Commands::Queue(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            cmd.run(&pool).await?;
        }
        Some(Commands::Sync(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            cmd.run(&pool, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        Some(Commands::Profile(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
