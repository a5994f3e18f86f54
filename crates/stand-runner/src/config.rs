//! Runner configuration

use serde::{Deserialize, Serialize};
use stand_core::{ConfigError, MetricDefinition, RunSettings};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete runner configuration, read from a TOML file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StandConfig {
    /// Monitoring backend base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Directory holding the compose project
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Program used to drive compose
    #[serde(default = "default_compose_program")]
    pub compose_program: String,

    /// Warm-up after start, in seconds
    #[serde(default = "default_start_delay")]
    pub start_delay_secs: u64,

    /// Total ticking time, in seconds
    #[serde(default = "default_test_duration")]
    pub test_duration_secs: u64,

    /// Pause between ticks, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Metrics to watch, in report order
    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,
}

fn default_endpoint() -> String {
    "http://localhost:9090".to_string()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_compose_program() -> String {
    "docker".to_string()
}

fn default_start_delay() -> u64 {
    10
}

fn default_test_duration() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for StandConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            work_dir: default_work_dir(),
            compose_program: default_compose_program(),
            start_delay_secs: default_start_delay(),
            test_duration_secs: default_test_duration(),
            poll_interval_secs: default_poll_interval(),
            metrics: Vec::new(),
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub start_delay_secs: Option<u64>,
    pub test_duration_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
}

impl StandConfig {
    /// Read and parse a config file. Does not validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(endpoint) = &overrides.endpoint {
            self.endpoint = endpoint.clone();
        }
        if let Some(secs) = overrides.start_delay_secs {
            self.start_delay_secs = secs;
        }
        if let Some(secs) = overrides.test_duration_secs {
            self.test_duration_secs = secs;
        }
        if let Some(secs) = overrides.poll_interval_secs {
            self.poll_interval_secs = secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint is empty".to_string()));
        }
        if self.metrics.is_empty() {
            return Err(ConfigError::Invalid("no metrics configured".to_string()));
        }

        let mut seen = HashSet::new();
        for metric in &self.metrics {
            if metric.name.trim().is_empty() {
                return Err(ConfigError::Invalid("metric with empty name".to_string()));
            }
            if metric.query.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "metric {} has an empty query",
                    metric.name
                )));
            }
            if !metric.ceiling.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "metric {} has a non-finite ceiling",
                    metric.name
                )));
            }
            if !seen.insert(metric.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "metric {} is configured twice",
                    metric.name
                )));
            }
        }

        self.run_settings().validate()
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            start_delay: Duration::from_secs(self.start_delay_secs),
            test_duration: Duration::from_secs(self.test_duration_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }
}
