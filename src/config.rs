use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::settings::{DisplayCount, InitialSource, Settings};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub defaults: DefaultsConfig,
    pub log: LogConfig,
}

/// Where the catalog, history and settings are kept
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file (empty = encore.redb in the user data dir)
    pub db_path: Option<String>,
    /// Keep everything in memory; nothing survives the process
    pub memory_only: bool,
}

/// Settings used on first run, before any have been saved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Never propose a song that is already in history
    pub prevent_duplicates: bool,
    /// Initial candidate source: "all" or "unproposed"
    pub initial_source: InitialSource,
    /// Songs per recommendation: 1 or 3
    pub display_count: DisplayCount,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            prevent_duplicates: settings.prevent_duplicates,
            initial_source: settings.initial_source,
            display_count: settings.display_count,
        }
    }
}

impl From<&DefaultsConfig> for Settings {
    fn from(defaults: &DefaultsConfig) -> Self {
        Settings {
            prevent_duplicates: defaults.prevent_duplicates,
            initial_source: defaults.initial_source,
            display_count: defaults.display_count,
        }
    }
}

/// Logging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// tracing filter directive, overridden by ENCORE_LOG
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("encore");

        fs::create_dir_all(&config_dir)
            .context("Failed to create config directory")?;

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from file, or create default if not exists
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .context("Failed to read config file")?;

            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?;

            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Generate example config content for documentation
    pub fn example_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
