//! Server configuration, read from the environment.
//!
//! - `JAGDLOG_PORT`: port to listen on (default: 8080)
//! - `JAGDLOG_SERVER_DATABASE`: SQLite file (default: `<data dir>/jagdlog-server/jagdlog.db`)
//! - `JAGDLOG_PULL_PAGE_SIZE`: rows per table returned by a pull (default: 100)
//! - `JAGDLOG_HISTORY_LIMIT`: analyses returned by the history endpoint (default: 50)

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::ConfigError;
use crate::sync::DEFAULT_PAGE_SIZE;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub database_path: PathBuf,
    /// Rows per table on the `GET /api/sync` feed.
    pub pull_page_size: u32,
    pub history_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: default_database_path(),
            pull_page_size: DEFAULT_PAGE_SIZE,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_or_default(&lookup, "JAGDLOG_PORT", DEFAULT_PORT)?;
        let database_path = optional_trimmed(&lookup, "JAGDLOG_SERVER_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);
        let pull_page_size = positive(
            "JAGDLOG_PULL_PAGE_SIZE",
            parse_or_default(&lookup, "JAGDLOG_PULL_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
        )?;
        let history_limit = positive(
            "JAGDLOG_HISTORY_LIMIT",
            parse_or_default(&lookup, "JAGDLOG_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
        )?;

        Ok(Self {
            port,
            database_path,
            pull_page_size,
            history_limit,
        })
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jagdlog-server")
        .join("jagdlog.db")
}

fn parse_or_default<T: FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match optional_trimmed(lookup, name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{} must be a number, got '{}'", name, raw))),
        None => Ok(default),
    }
}

fn positive(name: &str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{} must be greater than 0", name)));
    }
    Ok(value)
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ServerConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.pull_page_size, 100);
        assert_eq!(config.history_limit, 50);
        assert!(config.database_path.ends_with("jagdlog-server/jagdlog.db"));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("JAGDLOG_PORT", "9000"),
            ("JAGDLOG_SERVER_DATABASE", "/srv/jagdlog/sync.db"),
            ("JAGDLOG_PULL_PAGE_SIZE", " 500 "),
            ("JAGDLOG_HISTORY_LIMIT", "10"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_path, PathBuf::from("/srv/jagdlog/sync.db"));
        assert_eq!(config.pull_page_size, 500);
        assert_eq!(config.history_limit, 10);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = config_from(&[("JAGDLOG_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("JAGDLOG_PORT"));

        let err = config_from(&[("JAGDLOG_PULL_PAGE_SIZE", "0")]).unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }
}
