//! Lifecycle policy configuration.
//!
//! The policy values can be tuned per deployment: the holding timeout, the
//! daily creation quota, the minimum workflow size accepted as proof of work,
//! and the timeout sweep interval. Values are read from TOML; keys that are
//! absent keep their defaults.
//!
//! ```toml
//! task_timeout_hours = 24
//! daily_task_limit = 5
//! min_workflow_blocks = 2
//! sweep_interval_secs = 300
//! ```

use camino::Utf8Path;
use cap_std::fs_utf8::Dir;
use chrono::TimeDelta;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Default holding duration, in hours, before a taken task is released.
pub const DEFAULT_TASK_TIMEOUT_HOURS: u32 = 24;
/// Default number of tasks one identity may create per UTC day.
pub const DEFAULT_DAILY_TASK_LIMIT: u32 = 5;
/// Default minimum node count for a workflow to complete a task.
pub const DEFAULT_MIN_WORKFLOW_BLOCKS: usize = 2;
/// Default interval, in seconds, between timeout sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Errors returned while loading lifecycle configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Io {
        /// Path relative to the configuration directory.
        path: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has unknown keys.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its permitted range.
    #[error("configuration value `{key}` must be greater than zero")]
    NotPositive {
        /// Offending key.
        key: &'static str,
    },
}

/// Lifecycle policy values.
///
/// # Examples
///
/// ```
/// use taskboard::config::LifecycleConfig;
///
/// let config = LifecycleConfig::default();
/// assert_eq!(config.daily_task_limit(), 5);
/// assert_eq!(config.min_workflow_blocks(), 2);
///
/// let strict = LifecycleConfig::default().with_daily_task_limit(1);
/// assert_eq!(strict.daily_task_limit(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    task_timeout: TimeDelta,
    daily_task_limit: u32,
    min_workflow_blocks: usize,
    sweep_interval: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            task_timeout: TimeDelta::hours(i64::from(DEFAULT_TASK_TIMEOUT_HOURS)),
            daily_task_limit: DEFAULT_DAILY_TASK_LIMIT,
            min_workflow_blocks: DEFAULT_MIN_WORKFLOW_BLOCKS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawLifecycleConfig {
    task_timeout_hours: u32,
    daily_task_limit: u32,
    min_workflow_blocks: usize,
    sweep_interval_secs: u64,
}

impl Default for RawLifecycleConfig {
    fn default() -> Self {
        Self {
            task_timeout_hours: DEFAULT_TASK_TIMEOUT_HOURS,
            daily_task_limit: DEFAULT_DAILY_TASK_LIMIT,
            min_workflow_blocks: DEFAULT_MIN_WORKFLOW_BLOCKS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl LifecycleConfig {
    /// Parses configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::NotPositive`] when a value is zero.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: RawLifecycleConfig = toml::from_str(source)?;
        let config = Self {
            task_timeout: TimeDelta::hours(i64::from(raw.task_timeout_hours)),
            daily_task_limit: raw.daily_task_limit,
            min_workflow_blocks: raw.min_workflow_blocks,
            sweep_interval: Duration::from_secs(raw.sweep_interval_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file located under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise
    /// the errors of [`Self::from_toml_str`].
    pub fn load(dir: &Dir, path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = dir.read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.as_str().to_owned(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks that every value is positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotPositive`] naming the first zero value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.task_timeout <= TimeDelta::zero() {
            return Err(ConfigError::NotPositive {
                key: "task_timeout_hours",
            });
        }
        if self.daily_task_limit == 0 {
            return Err(ConfigError::NotPositive {
                key: "daily_task_limit",
            });
        }
        if self.min_workflow_blocks == 0 {
            return Err(ConfigError::NotPositive {
                key: "min_workflow_blocks",
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::NotPositive {
                key: "sweep_interval_secs",
            });
        }
        Ok(())
    }

    /// Sets the holding duration before automatic release.
    #[must_use]
    pub const fn with_task_timeout(mut self, timeout: TimeDelta) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Sets the per-identity daily creation limit.
    #[must_use]
    pub const fn with_daily_task_limit(mut self, limit: u32) -> Self {
        self.daily_task_limit = limit;
        self
    }

    /// Sets the minimum node count for a completing workflow.
    #[must_use]
    pub const fn with_min_workflow_blocks(mut self, blocks: usize) -> Self {
        self.min_workflow_blocks = blocks;
        self
    }

    /// Sets the interval between timeout sweeps.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Returns the holding duration before automatic release.
    #[must_use]
    pub const fn task_timeout(&self) -> TimeDelta {
        self.task_timeout
    }

    /// Returns the per-identity daily creation limit.
    #[must_use]
    pub const fn daily_task_limit(&self) -> u32 {
        self.daily_task_limit
    }

    /// Returns the minimum node count for a completing workflow.
    #[must_use]
    pub const fn min_workflow_blocks(&self) -> usize {
        self.min_workflow_blocks
    }

    /// Returns the interval between timeout sweeps.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}
