use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::sync::DEFAULT_RETENTION_DAYS;

/// Default auto-sync interval in seconds.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Server URL (e.g. "http://localhost:8080" or "https://sync.example.com")
    pub server_url: Option<String>,
    /// Sync after commands that write local data
    pub auto_sync: bool,
    pub interval_secs: u64,
    /// Days to keep completed queue items
    pub queue_retention_days: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            auto_sync: false,
            interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            queue_retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl SyncConfig {
    /// Returns true if a server URL is set
    pub fn is_configured(&self) -> bool {
        self.server_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the local SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Hunter recorded on new entries
    pub user_id: ConfigValue<String>,
    /// Hunting ground recorded on new entries
    pub revier_id: ConfigValue<String>,
    /// Directory holding client profiles (`<client>.config.json`)
    pub profiles_dir: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub sync: SyncConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    user_id: Option<String>,
    revier_id: Option<String>,
    profiles_dir: Option<PathBuf>,
    sync: Option<SyncConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = std::env::vars().collect();
        Self::load_with(config_path, |name| values.get(name).cloned())
    }

    /// Like [`Config::load`], reading environment overrides through `lookup`.
    pub fn load_with(
        config_path: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut database_path = ConfigValue::new(
            Self::default_data_dir().join("jagdlog.db"),
            ConfigSource::Default,
        );
        let mut user_id = ConfigValue::new("anonymous".to_string(), ConfigSource::Default);
        let mut revier_id = ConfigValue::new("default".to_string(), ConfigSource::Default);
        let mut profiles_dir = ConfigValue::new(
            Self::default_config_dir().join("profiles"),
            ConfigSource::Default,
        );
        let mut config_file = None;
        let mut sync = SyncConfig::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let file_config: ConfigFile =
                serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                database_path =
                    ConfigValue::new(resolve_relative(&path, db_path), ConfigSource::File);
            }
            if let Some(dir) = file_config.profiles_dir {
                profiles_dir = ConfigValue::new(resolve_relative(&path, dir), ConfigSource::File);
            }
            if let Some(user) = file_config.user_id {
                user_id = ConfigValue::new(user, ConfigSource::File);
            }
            if let Some(revier) = file_config.revier_id {
                revier_id = ConfigValue::new(revier, ConfigSource::File);
            }
            if let Some(sync_config) = file_config.sync {
                sync = sync_config;
            }
        }

        if let Some(db_path) = lookup("JAGDLOG_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Some(user) = lookup("JAGDLOG_USER_ID") {
            user_id = ConfigValue::new(user, ConfigSource::Environment);
        }
        if let Some(revier) = lookup("JAGDLOG_REVIER_ID") {
            revier_id = ConfigValue::new(revier, ConfigSource::Environment);
        }
        if let Some(dir) = lookup("JAGDLOG_PROFILES_DIR") {
            profiles_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Some(url) = lookup("JAGDLOG_SYNC_URL") {
            sync.server_url = Some(url);
        }

        if sync.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sync.interval_secs must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            database_path,
            user_id,
            revier_id,
            profiles_dir,
            config_file,
            sync,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/jagdlog/
    /// - macOS: ~/Library/Application Support/jagdlog/
    /// - Windows: %APPDATA%/jagdlog/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jagdlog")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/jagdlog/
    /// - macOS: ~/Library/Application Support/jagdlog/
    /// - Windows: %APPDATA%/jagdlog/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jagdlog")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolves a relative path from the config file against the file's directory.
fn resolve_relative(config_path: &std::path::Path, value: PathBuf) -> PathBuf {
    if value.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&value))
            .unwrap_or(value)
    } else {
        value
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
