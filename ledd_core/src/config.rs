//! Configuration file support for ledd.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/ledd/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Report output configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Drug catalog source
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// CSV catalog replacing the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Schedule synthesis tuning, in minutes
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Plan B: how long before a meal the pre-meal dose goes
    #[serde(default = "default_pre_meal_lead")]
    pub pre_meal_lead_minutes: u32,

    /// Plan B: how long before sleep the pre-sleep dose goes
    #[serde(default = "default_pre_sleep_lead")]
    pub pre_sleep_lead_minutes: u32,

    /// Plan B: morning OFF dose relative to waking (0 = on waking)
    #[serde(default)]
    pub morning_off_lead_minutes: u32,

    /// Plan B: how long before a recorded OFF period the dose goes
    #[serde(default = "default_off_onset_lead")]
    pub off_onset_lead_minutes: u32,

    /// Plan C: slots this close to a group's first slot are merged onto it
    #[serde(default = "default_consolidation_window")]
    pub consolidation_window_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            pre_meal_lead_minutes: default_pre_meal_lead(),
            pre_sleep_lead_minutes: default_pre_sleep_lead(),
            morning_off_lead_minutes: 0,
            off_onset_lead_minutes: default_off_onset_lead(),
            consolidation_window_minutes: default_consolidation_window(),
        }
    }
}

// Default value functions
fn home_fallback(relative: &str) -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(relative),
        None => {
            tracing::warn!("HOME is not set; using the working directory");
            PathBuf::from(".")
        }
    }
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_fallback(".local/share"));
    base.join("ledd")
}

fn default_pre_meal_lead() -> u32 {
    30
}

fn default_pre_sleep_lead() -> u32 {
    30
}

fn default_off_onset_lead() -> u32 {
    30
}

fn default_consolidation_window() -> u32 {
    60
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_fallback(".config"));
        base.join("ledd").join("config.toml")
    }

    /// Render as a TOML document
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
