use clap::{Args, Subcommand};

use super::OutputFormat;
use jagdlog::config::Config;
use jagdlog::profiles::{ProfileCache, ProfileLoader};

#[derive(Args)]
pub struct ProfileCommand {
    #[command(subcommand)]
    pub command: ProfileSubcommand,
}

#[derive(Subcommand)]
pub enum ProfileSubcommand {
    /// Show a client's profile (falls back to the default profile)
    Show {
        /// Client key (e.g. SEINE)
        client: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Check a client's profile for required fields
    Validate {
        /// Client key
        client: String,
    },

    /// List client profiles
    List,
}

impl ProfileCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let loader = ProfileLoader::new(&config.profiles_dir.value);
        let mut cache = ProfileCache::new();

        match &self.command {
            ProfileSubcommand::Show { client, format } => {
                let profile = loader.load(&mut cache, client)?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&profile.config)?);
                    }
                    OutputFormat::Text => {
                        println!("Client:  {}", profile.client);
                        println!("File:    {}", profile.path.display());
                        if profile.is_default {
                            println!("         (default profile)");
                        }
                        let company = profile
                            .config
                            .pointer("/company/name")
                            .and_then(|v| v.as_str())
                            .unwrap_or("-");
                        println!("Company: {}", company);
                    }
                }
                Ok(())
            }

            ProfileSubcommand::Validate { client } => {
                let profile = loader.load(&mut cache, client)?;
                let result = ProfileLoader::validate(&profile.config);

                for error in &result.errors {
                    println!("✗ {}", error);
                }
                for warning in &result.warnings {
                    println!("! {}", warning);
                }

                if result.is_valid() {
                    println!("✓ {} is valid ({})", client, profile.path.display());
                    Ok(())
                } else {
                    Err(format!("{} has {} error(s)", client, result.errors.len()).into())
                }
            }

            ProfileSubcommand::List => {
                let profiles = loader.load_all()?;
                if profiles.is_empty() {
                    println!("No profiles in {}", loader.dir().display());
                    return Ok(());
                }
                println!("{:<16}  {:<6}  FILE", "CLIENT", "VALID");
                println!("{}", "-".repeat(70));
                for (client, profile) in &profiles {
                    let valid = ProfileLoader::validate(&profile.config).is_valid();
                    println!(
                        "{:<16}  {:<6}  {}",
                        client,
                        if valid { "yes" } else { "no" },
                        profile.path.display()
                    );
                }
                Ok(())
            }
        }
    }
}
