//! Configuration loading and typed config structures for Aquaflow.
//!
//! The canonical configuration lives in `aquaflow-config.yaml` next to the
//! engine binary. This module defines strongly-typed structs that mirror the
//! YAML structure and a loader that reads and validates the file. Every
//! field has a default, so an empty file (or no file) runs the stock demo.

use std::path::Path;
use std::time::Duration;

use aquaflow_types::SpeedMultiplier;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::stage::{self, Stage, StageError, StageSequencer};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The stage plan is invalid.
    #[error("invalid stage plan: {source}")]
    Stages {
        /// The underlying stage error.
        #[from]
        source: StageError,
    },

    /// A value is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors `aquaflow-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AquaflowConfig {
    /// Engine timing.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Raw water and approval limit.
    #[serde(default)]
    pub water: WaterConfig,

    /// Adsorption filter wear.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Volume and cost of one treated batch.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Ordered stage plan.
    #[serde(default = "stage::default_stages")]
    pub stages: Vec<Stage>,

    /// Observer HTTP server.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AquaflowConfig {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            water: WaterConfig::default(),
            filter: FilterConfig::default(),
            batch: BatchConfig::default(),
            stages: stage::default_stages(),
            observer: ObserverConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AquaflowConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// Environment variables override YAML values:
    /// - `AQUAFLOW_OBSERVER_PORT` overrides `observer.port`
    /// - `AQUAFLOW_LOG_LEVEL` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or a validation error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or a
    /// validation error.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override values with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("AQUAFLOW_OBSERVER_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.observer.port = port,
                Err(e) => warn!(value = val, error = %e, "ignoring invalid AQUAFLOW_OBSERVER_PORT"),
            }
        }
        if let Ok(val) = std::env::var("AQUAFLOW_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Check value ranges and the stage plan.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] or [`ConfigError::Stages`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "engine.poll_interval_ms must be at least 1".to_owned(),
            });
        }
        if self.water.approval_limit_ppm <= 0.0 {
            return Err(ConfigError::Invalid {
                reason: "water.approval_limit_ppm must be positive".to_owned(),
            });
        }
        if self.filter.fresh_target_ppm < 0.0 || self.filter.degraded_target_ppm < 0.0 {
            return Err(ConfigError::Invalid {
                reason: "filter targets must not be negative".to_owned(),
            });
        }
        if self.batch.cost.is_sign_negative() {
            return Err(ConfigError::Invalid {
                reason: "batch.cost must not be negative".to_owned(),
            });
        }
        self.stage_plan()?;
        Ok(())
    }

    /// Build the validated stage plan.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Stages`] if the plan is invalid.
    pub fn stage_plan(&self) -> Result<StageSequencer, ConfigError> {
        Ok(StageSequencer::new(self.stages.clone())?)
    }
}

/// Engine timing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EngineSettings {
    /// Real-time granularity of every wait poll, independent of speed.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Speed multiplier at startup (1, 10, 100 or 1000).
    #[serde(default)]
    pub initial_speed: SpeedMultiplier,
}

impl EngineSettings {
    /// Poll interval as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            initial_speed: SpeedMultiplier::X1,
        }
    }
}

/// Raw water and the approval threshold of the quality test.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WaterConfig {
    /// Contaminant concentration of untreated water, in ppm.
    #[serde(default = "default_raw_ppm")]
    pub raw_ppm: f64,

    /// pH of untreated water.
    #[serde(default = "default_raw_ph")]
    pub raw_ph: f64,

    /// Water is approved when the final concentration is below this value.
    #[serde(default = "default_approval_limit_ppm")]
    pub approval_limit_ppm: f64,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            raw_ppm: default_raw_ppm(),
            raw_ph: default_raw_ph(),
            approval_limit_ppm: default_approval_limit_ppm(),
        }
    }
}

/// Adsorption filter wear parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FilterConfig {
    /// Completed runs after which the filter is worn.
    #[serde(default = "default_degrade_after_uses")]
    pub degrade_after_uses: u32,

    /// Adsorption target of a fresh filter, in ppm.
    #[serde(default = "default_fresh_target_ppm")]
    pub fresh_target_ppm: f64,

    /// Adsorption target of a worn filter, in ppm.
    #[serde(default = "default_degraded_target_ppm")]
    pub degraded_target_ppm: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            degrade_after_uses: default_degrade_after_uses(),
            fresh_target_ppm: default_fresh_target_ppm(),
            degraded_target_ppm: default_degraded_target_ppm(),
        }
    }
}

/// Quantities added to the cumulative stats per completed run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchConfig {
    /// Liters treated per run.
    #[serde(default = "default_volume_liters")]
    pub volume_liters: u64,

    /// Cost of one run.
    #[serde(default = "default_batch_cost")]
    pub cost: Decimal,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            volume_liters: default_volume_liters(),
            cost: default_batch_cost(),
        }
    }
}

/// Observer server binding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Host address to bind.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_poll_interval_ms() -> u64 {
    100
}

const fn default_raw_ppm() -> f64 {
    50.0
}

const fn default_raw_ph() -> f64 {
    7.0
}

const fn default_approval_limit_ppm() -> f64 {
    1.5
}

const fn default_degrade_after_uses() -> u32 {
    3
}

const fn default_fresh_target_ppm() -> f64 {
    0.82
}

const fn default_degraded_target_ppm() -> f64 {
    1.8
}

const fn default_volume_liters() -> u64 {
    1000
}

fn default_batch_cost() -> Decimal {
    Decimal::new(1250, 2)
}

fn default_observer_host() -> String {
    String::from("0.0.0.0")
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AquaflowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.filter.fresh_target_ppm, 0.82);
        assert_eq!(config.batch.cost, Decimal::new(1250, 2));
        assert_eq!(config.stages.len(), 6);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = AquaflowConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = "engine:\n  initial_speed: 100\nfilter:\n  degraded_target_ppm: 2.5\n";
        let config = AquaflowConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();
        assert_eq!(config.engine.initial_speed, SpeedMultiplier::X100);
        assert_eq!(config.filter.degraded_target_ppm, 2.5);
        assert_eq!(config.filter.degrade_after_uses, 3);
        assert_eq!(config.water.raw_ppm, 50.0);
    }

    #[test]
    fn parse_custom_stages_and_cost() {
        let yaml = r#"
batch:
  volume_liters: 250
  cost: "3.75"
stages:
  - name: intake
    nominal_ms: 500
    type: pipe_transfer
  - name: adsorption
    nominal_ms: 800
    type: reaction_decay
    to_ppm: 0.82
    filter_bound: true
"#;
        let config = AquaflowConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();
        assert_eq!(config.batch.volume_liters, 250);
        assert_eq!(config.batch.cost, Decimal::new(375, 2));
        let plan = config.stage_plan();
        assert!(plan.is_ok());
        assert_eq!(plan.map(|p| p.total_nominal()).ok(), Some(Duration::from_millis(1300)));
    }

    #[test]
    fn rejects_unknown_speed() {
        let yaml = "engine:\n  initial_speed: 3\n";
        assert!(matches!(AquaflowConfig::parse(yaml), Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let yaml = "engine:\n  poll_interval_ms: 0\n";
        assert!(matches!(AquaflowConfig::parse(yaml), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_empty_stage_plan() {
        let yaml = "stages: []\n";
        assert!(matches!(AquaflowConfig::parse(yaml), Err(ConfigError::Stages { .. })));
    }
}
