//! `.envlockerrc` mapping file

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use envlocker_secrets::ItemLocator;
use serde::Deserialize;

/// Name of the mapping file, looked up in the base directory
pub const CONFIG_FILE_NAME: &str = ".envlockerrc";

/// Environment variable selecting the active environment
pub const ENV_NAME_VAR: &str = "ENVLOCKER_ENV_NAME";

/// Environment used when none is given
pub const DEFAULT_ENV_NAME: &str = "development";

/// One environment's entry in the mapping file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnvironmentEntry {
    /// Item reference (id or title). Missing or empty means "nothing to fetch".
    #[serde(default)]
    pub item: Option<String>,

    #[serde(default)]
    pub vault: Option<String>,

    #[serde(default)]
    pub account: Option<String>,
}

impl EnvironmentEntry {
    /// The item reference, if present and non-empty
    pub fn item_reference(&self) -> Option<&str> {
        self.item.as_deref().filter(|item| !item.is_empty())
    }

    pub fn locator(&self) -> ItemLocator {
        ItemLocator {
            account: self.account.clone(),
            vault: self.vault.clone(),
        }
    }
}

/// Environment name -> entry, as stored in `.envlockerrc`.
///
/// Only the top level has to be a JSON object. Entries are decoded when
/// looked up, so keys that are not environments (`$schema`, comments) are
/// left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentMapping {
    pub environments: HashMap<String, serde_json::Value>,
}

/// Why a mapping file could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl EnvironmentMapping {
    /// Path of the mapping file inside `dir`
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }

    /// Load `.envlockerrc` from `dir`
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        Self::load(&Self::path_in(dir))
    }

    /// Load a mapping file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Decode the entry for `env_name`.
    ///
    /// A missing or `null` entry is `None`. A non-object entry has no item
    /// reference. An object whose fields have the wrong types is an error.
    pub fn entry(&self, env_name: &str) -> Result<Option<EnvironmentEntry>, serde_json::Error> {
        match self.environments.get(env_name) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value @ serde_json::Value::Object(_)) => {
                EnvironmentEntry::deserialize(value).map(Some)
            }
            Some(_) => Ok(Some(EnvironmentEntry::default())),
        }
    }
}

/// Pick the environment: explicit name, then the override variable, then the default
pub fn effective_env_name(explicit: Option<&str>, from_env: Option<String>) -> String {
    explicit
        .map(str::to_string)
        .or(from_env)
        .unwrap_or_else(|| DEFAULT_ENV_NAME.to_string())
}

/// [`effective_env_name`] reading the override from the process environment
pub fn env_name_from_process(explicit: Option<&str>) -> String {
    effective_env_name(explicit, std::env::var(ENV_NAME_VAR).ok())
}
