//! Per-client profile files.
//!
//! A profile lives at `<dir>/<client>.config.json` (client key lowercased).
//! Clients without their own file get `default.config.json`. String values
//! may reference environment variables as `{{ $env.NAME }}`; references to
//! unset variables are left as written.
//!
//! Loaded profiles are kept in a [`ProfileCache`] owned by the caller.

use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const PROFILE_SUFFIX: &str = ".config.json";
const DEFAULT_PROFILE: &str = "default.config.json";

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Failed to read profile '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse profile '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("No profile for '{client}' and no default profile in '{}'", dir.display())]
    NotFound { client: String, dir: PathBuf },
}

/// A loaded profile with environment references resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub client: String,
    pub path: PathBuf,
    /// True when the client had no file of its own.
    pub is_default: bool,
    pub config: Value,
}

/// Profiles already loaded, keyed by lowercased client key.
#[derive(Debug, Default)]
pub struct ProfileCache {
    entries: HashMap<String, Profile>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, client: &str) -> Option<&Profile> {
        self.entries.get(&client.to_lowercase())
    }

    pub fn insert(&mut self, profile: Profile) {
        self.entries.insert(profile.client.to_lowercase(), profile);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops one client's entry. Returns true if it was cached.
    pub fn invalidate(&mut self, client: &str) -> bool {
        self.entries.remove(&client.to_lowercase()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of [`ProfileLoader::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Validation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct ProfileLoader {
    dir: PathBuf,
    env: EnvLookup,
}

impl ProfileLoader {
    /// Loader reading `{{ $env.NAME }}` values from the process environment.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_env(dir, |name| std::env::var(name).ok())
    }

    pub fn with_env(
        dir: impl Into<PathBuf>,
        env: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            dir: dir.into(),
            env: Box::new(env),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the cached profile for `client`, loading and caching it on a miss.
    pub fn load(&self, cache: &mut ProfileCache, client: &str) -> Result<Profile, ProfileError> {
        if let Some(profile) = cache.get(client) {
            return Ok(profile.clone());
        }
        let profile = self.load_uncached(client)?;
        cache.insert(profile.clone());
        Ok(profile)
    }

    /// Reads `client`'s profile from disk, falling back to the default profile
    /// when the client has no file.
    pub fn load_uncached(&self, client: &str) -> Result<Profile, ProfileError> {
        let path = self
            .dir
            .join(format!("{}{}", client.to_lowercase(), PROFILE_SUFFIX));
        if !path.exists() {
            tracing::warn!(client, "no profile found, using default");
            return self.load_default(client);
        }

        Ok(Profile {
            client: client.to_string(),
            config: self.read(&path)?,
            path,
            is_default: false,
        })
    }

    fn load_default(&self, client: &str) -> Result<Profile, ProfileError> {
        let path = self.dir.join(DEFAULT_PROFILE);
        if !path.exists() {
            return Err(ProfileError::NotFound {
                client: client.to_string(),
                dir: self.dir.clone(),
            });
        }
        Ok(Profile {
            client: client.to_string(),
            config: self.read(&path)?,
            path,
            is_default: true,
        })
    }

    /// Loads every client profile in the directory, keyed by uppercased client
    /// key. The default profile is not included.
    pub fn load_all(&self) -> Result<BTreeMap<String, Profile>, ProfileError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| ProfileError::Read {
            path: self.dir.clone(),
            source,
        })?;

        let mut profiles = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|source| ProfileError::Read {
                path: self.dir.clone(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == DEFAULT_PROFILE {
                continue;
            }
            if let Some(stem) = name.strip_suffix(PROFILE_SUFFIX) {
                let client = stem.to_uppercase();
                let profile = self.load_uncached(&client)?;
                profiles.insert(client, profile);
            }
        }
        Ok(profiles)
    }

    fn read(&self, path: &Path) -> Result<Value, ProfileError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: Value = serde_json::from_str(&contents).map_err(|source| ProfileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(substitute_env(raw, &*self.env))
    }

    /// Checks the fields every profile needs.
    pub fn validate(config: &Value) -> Validation {
        let mut result = Validation::default();
        let present = |pointer: &str| match config.pointer(pointer) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };

        for (pointer, name) in [
            ("/company/name", "company.name"),
            ("/company/brand", "company.brand"),
            ("/workflow/ai/model", "workflow.ai.model"),
            ("/workflow/lead_id_prefix", "workflow.lead_id_prefix"),
        ] {
            if !present(pointer) {
                result.errors.push(format!("{} is required", name));
            }
        }
        if !present("/company/crm_sheet_id") {
            result.warnings.push("company.crm_sheet_id is missing".to_string());
        }
        if !present("/technical") {
            result
                .warnings
                .push("no technical parameters defined".to_string());
        }
        result
    }
}

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*\$env\.(\w+)\s*\}\}").expect("Invalid regex"))
}

/// Replaces `{{ $env.NAME }}` in every string of `value`.
fn substitute_env(value: Value, env: &(dyn Fn(&str) -> Option<String> + Send + Sync)) -> Value {
    match value {
        Value::String(s) => {
            let replaced = placeholder().replace_all(&s, |caps: &Captures| {
                env(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            });
            Value::String(replaced.into_owned())
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| substitute_env(v, env)).collect())
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, substitute_env(v, env)))
                .collect(),
        ),
        other => other,
    }
}
