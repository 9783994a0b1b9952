//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/bmsync/config.toml)
//! 3. Environment variables (BMSYNC_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable prefix
const ENV_PREFIX: &str = "BMSYNC";

/// File backing the primitive key/value store
const NATIVE_STORAGE_FILE: &str = "native_storage.json";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (relational db, native key/value file)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// File name of the relational database inside `data_dir`
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Log file for diagnostic output (stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Filter directive for diagnostic output
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Delay before an optimistic edit is queued for sync
    #[serde(default = "default_mutation_delay_ms")]
    pub mutation_delay_ms: u64,

    /// Delay before the undo alert is presented after a successful sync
    #[serde(default = "default_interface_ready_timeout_ms")]
    pub interface_ready_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_name: default_database_name(),
            log_file: None,
            log_level: default_log_level(),
            mutation_delay_ms: default_mutation_delay_ms(),
            interface_ready_timeout_ms: default_interface_ready_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (BMSYNC_DATA_DIR, BMSYNC_DATABASE_NAME, ...)
    /// 2. Config file (~/.config/bmsync/config.toml or BMSYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path from the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_DATABASE_NAME", ENV_PREFIX)) {
            if !val.is_empty() {
                self.database_name = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }

        // Empty string clears it
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with BMSYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bmsync")
            .join("config.toml")
    }

    /// Get the path to the relational database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_name)
    }

    /// Get the path to the file backing the primitive key/value store
    pub fn native_storage_path(&self) -> PathBuf {
        self.data_dir.join(NATIVE_STORAGE_FILE)
    }

    pub fn mutation_delay(&self) -> Duration {
        Duration::from_millis(self.mutation_delay_ms)
    }

    pub fn interface_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.interface_ready_timeout_ms)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bmsync")
}

fn default_database_name() -> String {
    "xbs.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_mutation_delay_ms() -> u64 {
    1000
}

fn default_interface_ready_timeout_ms() -> u64 {
    150
}
