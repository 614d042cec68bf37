//! Configuration file support for the interval timer.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/intervals/config.toml`.

use crate::types::{TimingConfig, WorkoutConfig};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub workout: WorkoutDefaults,

    #[serde(default)]
    pub timing: TimingSettings,
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

/// Workout shape used when no session is stored
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutDefaults {
    #[serde(default = "default_work_seconds")]
    pub work_seconds: u32,

    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,

    #[serde(default = "default_total_sets")]
    pub total_sets: u32,
}

impl Default for WorkoutDefaults {
    fn default() -> Self {
        Self {
            work_seconds: default_work_seconds(),
            rest_seconds: default_rest_seconds(),
            total_sets: default_total_sets(),
        }
    }
}

/// State machine timing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimingSettings {
    #[serde(default = "default_prep_seconds")]
    pub prep_seconds: u32,

    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            prep_seconds: default_prep_seconds(),
            transition_ms: default_transition_ms(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(std::env::temp_dir)
    });
    base.join("intervals")
}

fn default_work_seconds() -> u32 {
    30
}

fn default_rest_seconds() -> u32 {
    60
}

fn default_total_sets() -> u32 {
    5
}

fn default_prep_seconds() -> u32 {
    3
}

fn default_transition_ms() -> u64 {
    1200
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
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(std::env::temp_dir)
        });
        base.join("intervals").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        self.workout_config().validate().map_err(Error::Config)?;
        if self.timing.prep_seconds > 60 {
            return Err(Error::Config(format!(
                "prep_seconds must be at most 60 (got {})",
                self.timing.prep_seconds
            )));
        }
        if self.timing.transition_ms > 10_000 {
            return Err(Error::Config(format!(
                "transition_ms must be at most 10000 (got {})",
                self.timing.transition_ms
            )));
        }
        Ok(())
    }

    /// Default workout for a fresh session
    pub fn workout_config(&self) -> WorkoutConfig {
        WorkoutConfig {
            work_seconds: self.workout.work_seconds,
            rest_seconds: self.workout.rest_seconds,
            total_sets: self.workout.total_sets,
            preset_id: None,
        }
    }

    /// Remember `config` as the default workout
    pub fn set_workout_config(&mut self, config: &WorkoutConfig) {
        self.workout.work_seconds = config.work_seconds;
        self.workout.rest_seconds = config.rest_seconds;
        self.workout.total_sets = config.total_sets;
    }

    pub fn timing_config(&self) -> TimingConfig {
        TimingConfig {
            prep_seconds: self.timing.prep_seconds,
            transition_ms: self.timing.transition_ms,
        }
    }
}
