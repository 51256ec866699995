//! Configuration file support for Jejum.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/jejum/config.toml`.

use crate::catalog::{build_default_catalog, PlanCatalog};
use crate::poller::DEFAULT_TICK;
use crate::types::FastingPlan;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub timer: TimerConfig,

    #[serde(default)]
    pub plans: PlansConfig,

    #[serde(default)]
    pub water: WaterConfig,
}

/// Data storage configuration
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

/// Countdown refresh configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

impl TimerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Extra plan defined in the config file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomPlan {
    pub id: String,
    pub name: String,
    pub fast_hours: u32,
    pub eat_hours: u32,
    #[serde(default)]
    pub description: String,
}

impl From<&CustomPlan> for FastingPlan {
    fn from(custom: &CustomPlan) -> Self {
        FastingPlan {
            id: custom.id.clone(),
            name: custom.name.clone(),
            fast_hours: custom.fast_hours,
            eat_hours: custom.eat_hours,
            description: custom.description.clone(),
        }
    }
}

/// Plan catalog configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PlansConfig {
    /// Plan selected on first run, 16-8 when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_plan: Option<String>,

    #[serde(default)]
    pub custom: Vec<CustomPlan>,
}

/// Daily water goal configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WaterConfig {
    /// Goal used while the profile has no weight
    #[serde(default = "default_goal_ml")]
    pub default_goal_ml: u32,

    #[serde(default = "default_ml_per_kg")]
    pub ml_per_kg: u32,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            default_goal_ml: default_goal_ml(),
            ml_per_kg: default_ml_per_kg(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("jejum")
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK.as_millis() as u64
}

fn default_goal_ml() -> u32 {
    2500
}

fn default_ml_per_kg() -> u32 {
    33
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
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("jejum").join("config.toml")
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

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Built-in plans merged with custom ones, validated
    pub fn catalog(&self) -> Result<PlanCatalog> {
        let custom: Vec<FastingPlan> = self.plans.custom.iter().map(FastingPlan::from).collect();
        let mut catalog = build_default_catalog().with_custom(&custom);

        if let Some(id) = &self.plans.default_plan {
            catalog = catalog
                .with_default_plan(id)
                .map_err(|_| Error::Config(format!("default_plan {} is not a known plan", id)))?;
        }

        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(Error::Config(errors.join("; ")));
        }
        Ok(catalog)
    }
}
