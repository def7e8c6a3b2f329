//! Cache configuration.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use lapse_core::constants::{
    DEFAULT_INITIAL_CAPACITY, DEFAULT_SWEEP_INTERVAL_SECONDS, DEFAULT_TTL_SECONDS,
    ENV_DEFAULT_TTL_SECS, ENV_INITIAL_CAPACITY, ENV_SWEEP_INTERVAL_SECS,
};
use lapse_core::error::{LapseError, Result};

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL in seconds applied by `TtlCache::set`
    pub default_ttl_seconds: u64,
    /// Slots to pre-allocate; a sizing hint, never a limit
    pub initial_capacity: usize,
    /// Seconds between background sweeps
    pub sweep_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: DEFAULT_TTL_SECONDS, // 5 minutes
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
        }
    }
}

impl CacheConfig {
    /// Sets the default TTL.
    ///
    /// Sub-second precision is truncated; use `TtlCache::set_with_ttl` for
    /// finer-grained lifetimes.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_seconds = ttl.as_secs();
        self
    }

    /// Sets the pre-allocation hint.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_seconds = interval.as_secs();
        self
    }

    /// Default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    /// Sweep interval as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Checks that the values are usable.
    ///
    /// A zero default TTL is allowed (every `set` produces a stale entry) but
    /// logged, since it is rarely intended.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_seconds == 0 {
            return Err(LapseError::ConfigError(
                "sweep_interval_seconds must be greater than zero".into(),
            ));
        }
        if self.default_ttl_seconds == 0 {
            warn!("default_ttl_seconds is 0; entries set with the default TTL expire immediately");
        }
        Ok(())
    }

    /// Builds a configuration from defaults overridden by environment variables.
    ///
    /// Unset variables keep their default; set but unparsable ones are errors.
    #[instrument]
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(ttl) = env_override(ENV_DEFAULT_TTL_SECS)? {
            config.default_ttl_seconds = ttl;
        }
        if let Some(capacity) = env_override(ENV_INITIAL_CAPACITY)? {
            config.initial_capacity = capacity;
        }
        if let Some(interval) = env_override(ENV_SWEEP_INTERVAL_SECS)? {
            config.sweep_interval_seconds = interval;
        }
        config.validate()?;
        debug!(?config, "Loaded cache config from environment");
        Ok(config)
    }

    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&raw)?;
        debug!(?config, "Loaded cache config from file");
        Ok(config)
    }
}

fn env_override<T: FromStr>(var: &str) -> Result<Option<T>> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| LapseError::InvalidEnvVar {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}
