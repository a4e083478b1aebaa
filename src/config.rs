//! Configuration management for callgate.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{CallgateError, Result};

/// Prefix for environment overrides, e.g. `CALLGATE_MAX_CALLS=10`.
pub const ENV_PREFIX: &str = "CALLGATE";

/// What happens to the timestamp of a rejected call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionPolicy {
    /// Rejected calls are not recorded and never extend the window.
    #[default]
    Free,
    /// Rejected calls are recorded, so callers that keep retrying past the
    /// limit keep themselves locked out.
    Penalize,
}

/// Limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum admitted calls per window
    #[serde(default = "default_max_calls")]
    pub max_calls: u32,

    /// Sliding window, written as whole milliseconds under `window_ms`
    #[serde(default = "default_window", rename = "window_ms", with = "window_millis")]
    window: Duration,

    /// Handling of rejected attempts
    #[serde(default)]
    pub rejection_policy: RejectionPolicy,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            window: default_window(),
            rejection_policy: RejectionPolicy::default(),
        }
    }
}

fn default_max_calls() -> u32 {
    3
}

fn default_window() -> Duration {
    Duration::from_millis(3000)
}

mod window_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(window: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(window.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

impl LimiterConfig {
    /// Build a configuration from a call limit and window.
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            rejection_policy: RejectionPolicy::default(),
        }
    }

    /// Set the rejection policy.
    pub fn with_rejection_policy(mut self, policy: RejectionPolicy) -> Self {
        self.rejection_policy = policy;
        self
    }

    /// Replace the sliding window.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// The sliding window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Reject limits that cannot admit anything.
    pub fn validate(&self) -> Result<()> {
        if self.max_calls == 0 {
            return Err(CallgateError::InvalidConfiguration(
                "max_calls must be greater than 0".into(),
            ));
        }

        if self.window.is_zero() {
            return Err(CallgateError::InvalidConfiguration(
                "window must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: LimiterConfig = serde_yaml::from_str(yaml)
            .map_err(|e| CallgateError::Config(format!("Failed to parse limiter config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading limiter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load a configuration from an optional file, then apply `CALLGATE_*`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`LimiterConfig::load`], reading overrides from `env` instead of
    /// the process environment when given.
    pub fn load_with_env(path: Option<&Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading limiter configuration");
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true).source(env))
            .build()?;

        let config: LimiterConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
