use std::{fs, path::{Path, PathBuf}, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::acquisition::AcquisitionPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// How often the display is refreshed.
    pub tick_interval_ms: u64,
    pub acquisition: AcquisitionPolicy,
    /// GPX replay runs this many times faster than the recording.
    pub replay_speedup: f64,
    pub log_file: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            acquisition: AcquisitionPolicy::default(),
            replay_speedup: 1.0,
            log_file: None,
        }
    }
}

/// Values given on the command line. Anything set here wins over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub tick_interval_ms: Option<u64>,
    pub max_sample_age_secs: Option<u64>,
    pub sample_timeout_secs: Option<u64>,
    pub replay_speedup: Option<f64>,
    pub log_file: Option<PathBuf>,
}

impl TrackerConfig {
    /// Reads the JSON file if one is given, otherwise starts from the defaults.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let config = config.with_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(tick) = overrides.tick_interval_ms {
            self.tick_interval_ms = tick;
        }
        if let Some(age) = overrides.max_sample_age_secs {
            self.acquisition.max_sample_age_ms = age * 1000;
        }
        if let Some(timeout) = overrides.sample_timeout_secs {
            self.acquisition.sample_timeout_ms = timeout * 1000;
        }
        if let Some(speedup) = overrides.replay_speedup {
            self.replay_speedup = speedup;
        }
        if overrides.log_file.is_some() {
            self.log_file = overrides.log_file;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        if self.acquisition.sample_timeout_ms == 0 {
            return Err(ConfigError::Invalid("sample_timeout_ms must be positive".into()));
        }
        if !(self.replay_speedup.is_finite() && self.replay_speedup > 0.0) {
            return Err(ConfigError::Invalid(format!("replay_speedup must be positive, got {}", self.replay_speedup)));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
