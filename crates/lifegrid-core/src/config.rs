//! Configuration loading and typed config structures for lifegrid.
//!
//! The canonical configuration lives in `lifegrid-config.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure, a loader
//! that reads the file, and a validation pass. Every field has a default, so
//! an empty file (or no file at all) yields the reference 20x40 grid with a
//! 1000 ms base delay.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Environment variable that overrides `logging.level`.
pub const LOG_LEVEL_ENV: &str = "LIFEGRID_LOG_LEVEL";

/// Largest accepted value for `grid.rows` and `grid.cols`.
pub const MAX_GRID_DIMENSION: usize = 1_000;

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

    /// The configuration parsed but describes an unusable setup.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level lifegrid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LifeConfig {
    /// Grid dimensions.
    #[serde(default)]
    pub grid: GridConfig,

    /// Speed range and tick-delay formula.
    #[serde(default)]
    pub speed: SpeedConfig,

    /// Random fill settings.
    #[serde(default)]
    pub random: RandomConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LifeConfig {
    /// Load and validate configuration from a YAML file at the given path.
    ///
    /// `LIFEGRID_LOG_LEVEL` overrides `logging.level` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml maps an empty document to unit, not to an empty mapping.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.logging.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violated
    /// constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.rows == 0 || self.grid.cols == 0 {
            return Err(invalid(format!(
                "grid dimensions must be at least 1x1, got {}x{}",
                self.grid.rows, self.grid.cols
            )));
        }
        if self.grid.rows > MAX_GRID_DIMENSION || self.grid.cols > MAX_GRID_DIMENSION {
            return Err(invalid(format!(
                "grid dimensions must be at most {MAX_GRID_DIMENSION}x{MAX_GRID_DIMENSION}, got {}x{}",
                self.grid.rows, self.grid.cols
            )));
        }
        if self.speed.min > self.speed.max {
            return Err(invalid(format!(
                "speed.min ({}) exceeds speed.max ({})",
                self.speed.min, self.speed.max
            )));
        }
        if !self.speed.contains(self.speed.initial) {
            return Err(invalid(format!(
                "speed.initial ({}) is outside {}..={}",
                self.speed.initial, self.speed.min, self.speed.max
            )));
        }
        if self.speed.min_delay_ms == 0 {
            return Err(invalid("speed.min_delay_ms must be at least 1".to_owned()));
        }
        if !(0.0..=1.0).contains(&self.random.density) {
            return Err(invalid(format!(
                "random.density ({}) is outside 0.0..=1.0",
                self.random.density
            )));
        }
        Ok(())
    }
}

const fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid { reason }
}

/// Grid dimension configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GridConfig {
    /// Grid height in cells.
    #[serde(default = "default_rows")]
    pub rows: usize,

    /// Grid width in cells.
    #[serde(default = "default_cols")]
    pub cols: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
        }
    }
}

/// Speed range and the tick-delay formula.
///
/// The delay before the next tick is
/// `base_delay_ms - speed * delay_scale_per_speed_unit_ms`, never less
/// than `min_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SpeedConfig {
    /// Lowest accepted speed setting.
    #[serde(default)]
    pub min: u32,

    /// Highest accepted speed setting.
    #[serde(default = "default_max_speed")]
    pub max: u32,

    /// Speed setting at startup.
    #[serde(default = "default_initial_speed")]
    pub initial: u32,

    /// Delay at speed 0, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Milliseconds subtracted from the delay per speed unit.
    #[serde(default = "default_delay_scale_ms")]
    pub delay_scale_per_speed_unit_ms: u64,

    /// Floor for the computed delay, in milliseconds.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
}

impl SpeedConfig {
    /// Return `true` if `speed` lies within `min..=max`.
    pub const fn contains(&self, speed: u32) -> bool {
        speed >= self.min && speed <= self.max
    }

    /// Compute the inter-tick delay for a speed setting.
    ///
    /// Higher speeds give shorter delays. Arithmetic saturates, and the
    /// result is never below `min_delay_ms`.
    pub fn delay_for(&self, speed: u32) -> Duration {
        let reduction = u64::from(speed).saturating_mul(self.delay_scale_per_speed_unit_ms);
        let ms = self
            .base_delay_ms
            .saturating_sub(reduction)
            .max(self.min_delay_ms);
        Duration::from_millis(ms)
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: default_max_speed(),
            initial: default_initial_speed(),
            base_delay_ms: default_base_delay_ms(),
            delay_scale_per_speed_unit_ms: default_delay_scale_ms(),
            min_delay_ms: default_min_delay_ms(),
        }
    }
}

/// Random fill configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RandomConfig {
    /// Seed for the first random fill; later fills derive from it.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Default probability that a cell starts alive.
    #[serde(default = "default_density")]
    pub density: f64,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            density: default_density(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Replace `level` with `LIFEGRID_LOG_LEVEL` if that variable is set.
    pub fn apply_env_overrides(&mut self) {
        self.override_level(std::env::var(LOG_LEVEL_ENV).ok());
    }

    /// Blank values leave the configured level in place.
    fn override_level(&mut self, level: Option<String>) {
        if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
            self.level = level;
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

const fn default_rows() -> usize {
    20
}

const fn default_cols() -> usize {
    40
}

const fn default_max_speed() -> u32 {
    99
}

const fn default_initial_speed() -> u32 {
    50
}

const fn default_base_delay_ms() -> u64 {
    1000
}

const fn default_delay_scale_ms() -> u64 {
    10
}

const fn default_min_delay_ms() -> u64 {
    10
}

const fn default_seed() -> u64 {
    42
}

const fn default_density() -> f64 {
    0.25
}

fn default_log_level() -> String {
    "info".to_owned()
}
