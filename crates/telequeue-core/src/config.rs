//! Queue configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/telequeue/config.toml)
//! 3. Environment variables (TELEQUEUE_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable prefix
const ENV_PREFIX: &str = "TELEQUEUE";

/// Fixed name of the database file inside the data directory
pub const DB_FILE_NAME: &str = "queue.sqlite";

/// Number of records loaded per batch unless the caller asks otherwise
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the queue database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Default number of records per loaded batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TELEQUEUE_DATA_DIR, TELEQUEUE_BATCH_SIZE)
    /// 2. Config file (~/.config/telequeue/config.toml or TELEQUEUE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.normalize();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        config.normalize();
        Ok(config)
    }

    /// Configuration rooted at an explicit data directory, ignoring files and env
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // TELEQUEUE_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            if !val.is_empty() {
                self.data_dir = PathBuf::from(val);
            }
        }

        // TELEQUEUE_BATCH_SIZE
        if let Ok(val) = std::env::var(format!("{}_BATCH_SIZE", ENV_PREFIX)) {
            match val.parse::<usize>() {
                Ok(size) if size > 0 => self.batch_size = size,
                _ => warn!("Ignoring invalid {}_BATCH_SIZE value {:?}", ENV_PREFIX, val),
            }
        }
    }

    /// A zero batch size would never drain anything
    fn normalize(&mut self) {
        if self.batch_size == 0 {
            warn!(
                "batch_size = 0 is not usable, falling back to {}",
                DEFAULT_BATCH_SIZE
            );
            self.batch_size = DEFAULT_BATCH_SIZE;
        }
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TELEQUEUE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("telequeue")
            .join("config.toml")
    }

    /// Get the path to the queue database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

/// Default data directory: the platform cache directory
fn default_data_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("telequeue")
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
