use clap::{Args, Subcommand};

use super::OutputFormat;
use jagdlog::config::{Config, ConfigValue};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        print_value("database_path", &config.database_path, |p| {
                            p.display().to_string()
                        });
                        print_value("user_id", &config.user_id, Clone::clone);
                        print_value("revier_id", &config.revier_id, Clone::clone);
                        print_value("profiles_dir", &config.profiles_dir, |p| {
                            p.display().to_string()
                        });

                        println!("sync:");
                        println!(
                            "  server_url: {}",
                            config.sync.server_url.as_deref().unwrap_or("(not set)")
                        );
                        println!("  auto_sync: {}", config.sync.auto_sync);
                        println!("  interval_secs: {}", config.sync.interval_secs);
                        println!(
                            "  queue_retention_days: {}",
                            config.sync.queue_retention_days
                        );
                    }
                }
                Ok(())
            }
        }
    }
}

fn print_value<T>(name: &str, value: &ConfigValue<T>, render: impl Fn(&T) -> String) {
    println!("{}: {}", name, render(&value.value));
    println!("  source: {}", value.source);
    println!();
}
