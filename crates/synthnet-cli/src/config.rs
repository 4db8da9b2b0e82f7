//! Configuration management for the synthnet CLI

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Store file used when neither `--db` nor the config names one
pub const DEFAULT_DATABASE: &str = "network.db";

/// Global CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Default network store file
    pub database: Option<PathBuf>,

    /// Default logging level
    pub log_level: Option<String>,

    /// Defaults for new connection groups
    pub connections: ConnectionDefaults,

    /// User preferences
    pub preferences: UserPreferences,
}

/// Values `connect` falls back to when a flag is omitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionDefaults {
    /// Smallest delay for new connections
    pub min_delay: u32,

    /// Largest delay for new connections
    pub max_delay: u32,

    /// Synapse type id
    pub synapse_type: u16,

    /// Fixed random seed; fresh entropy when absent
    pub seed: Option<u64>,
}

/// Terminal preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Show progress bars
    pub show_progress: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database: None,
            log_level: Some("info".to_string()),
            connections: ConnectionDefaults::default(),
            preferences: UserPreferences::default(),
        }
    }
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        Self {
            min_delay: 1,
            max_delay: 1,
            synapse_type: 1,
            seed: None,
        }
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self { show_progress: true }
    }
}

impl CliConfig {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)
                .map_err(|e| CliError::config(format!("Invalid config file: {}", e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::config("Could not determine config directory"))?;
        Ok(config_dir.join("synthnet").join("config.toml"))
    }

    /// Load from `path`, or from the default location when none is given.
    ///
    /// Without a usable config directory the defaults apply.
    pub fn resolve(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_config_path() {
                Ok(path) => Self::load_from_file(&path),
                Err(_) => Ok(Self::default()),
            },
        }
    }

    /// Store file after applying an explicit override
    pub fn database_path(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.database.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
    }
}
