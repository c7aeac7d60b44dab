use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TrackRsError;
use crate::geo::DEFAULT_NOISE_FLOOR_METERS;
use crate::logging::LogConfig;
use crate::metrics::DEFAULT_ELEVATION_DEAD_BAND_METERS;
use crate::models::{Goal, GoalKind, Units};
use crate::session::{EngineConfig, StepBaselineMode};
use crate::sync::DEFAULT_DEVICE_NAME;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Session tracking preferences
    #[serde(default)]
    pub tracker: TrackerSettings,

    /// Run history storage
    #[serde(default)]
    pub storage: StorageSettings,

    /// Sync transport settings
    #[serde(default)]
    pub sync: SyncSettings,

    /// Logging output
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Goal as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalSettings {
    pub kind: GoalKind,

    /// Meters, milliseconds or steps depending on `kind`
    pub target: f64,
}

impl Default for GoalSettings {
    fn default() -> Self {
        Self {
            kind: GoalKind::None,
            target: 0.0,
        }
    }
}

/// Preferences snapshotted into each session at start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Display units; stored metrics stay in meters
    pub units: Units,

    /// Enable repeating distance milestones
    pub distance_alerts: bool,

    /// Milestone interval in meters (1000 for km, 1609 for miles)
    pub alert_interval_meters: f64,

    /// Record splits automatically
    pub auto_lap: bool,

    /// Split interval; defaults to the milestone interval
    pub split_interval_meters: Option<f64>,

    /// Movements at or below this distance are GPS jitter
    pub noise_floor_meters: f64,

    /// Altitude changes within this band are ignored
    pub elevation_dead_band_meters: f64,

    /// When the step counter baseline is captured
    pub step_baseline: StepBaselineMode,

    /// Clock tick cadence used when replaying recorded sensor logs
    pub tick_interval_ms: u64,

    pub goal: GoalSettings,
}

/// Run history storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding run files
    pub data_dir: PathBuf,

    /// Number of runs shown in history
    pub max_history: usize,
}

/// Sync transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Device name included in sync documents
    pub device_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            tracker: TrackerSettings::default(),
            storage: StorageSettings::default(),
            sync: SyncSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            units: Units::Metric,
            distance_alerts: true,
            alert_interval_meters: 1000.0,
            auto_lap: true,
            split_interval_meters: None,
            noise_floor_meters: DEFAULT_NOISE_FLOOR_METERS,
            elevation_dead_band_meters: DEFAULT_ELEVATION_DEAD_BAND_METERS,
            step_baseline: StepBaselineMode::FirstEvent,
            tick_interval_ms: 2000,
            goal: GoalSettings::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            data_dir: AppConfig::default_config_dir().join("runs"),
            max_history: 10,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
        }
    }
}

impl TrackerSettings {
    /// Goal captured by the next session start
    pub fn goal(&self) -> Goal {
        Goal::from_parts(self.goal.kind, self.goal.target)
    }

    /// Milestone interval, `None` when alerts are off
    pub fn alert_interval(&self) -> Option<f64> {
        (self.distance_alerts && self.alert_interval_meters > 0.0)
            .then_some(self.alert_interval_meters)
    }

    pub fn split_interval(&self) -> Option<f64> {
        if !self.auto_lap {
            return None;
        }
        self.split_interval_meters
            .or(Some(self.alert_interval_meters))
            .filter(|interval| *interval > 0.0)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            noise_floor_meters: self.noise_floor_meters,
            split_interval_meters: self.split_interval(),
            elevation_dead_band_meters: self.elevation_dead_band_meters,
            step_baseline: self.step_baseline,
        }
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> std::result::Result<(), TrackRsError> {
        let non_negative = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(TrackRsError::Configuration(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )))
            }
        };

        non_negative("alert_interval_meters", self.alert_interval_meters)?;
        non_negative("noise_floor_meters", self.noise_floor_meters)?;
        non_negative("elevation_dead_band_meters", self.elevation_dead_band_meters)?;
        if let Some(split) = self.split_interval_meters {
            non_negative("split_interval_meters", split)?;
        }

        if self.goal.kind != GoalKind::None && !(self.goal.target.is_finite() && self.goal.target > 0.0) {
            return Err(TrackRsError::Configuration(format!(
                "{} goal needs a positive target, got {}",
                self.goal.kind, self.goal.target
            )));
        }

        if self.tick_interval_ms == 0 {
            return Err(TrackRsError::Configuration(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config.tracker.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        // Update modification timestamp
        self.metadata.updated_at = Utc::now();

        // Create directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Directory holding the config file and default run storage
    pub fn default_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".trackrs")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %e,
                    "Config file not loaded, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to_file(config_path)
    }
}
