//! Engine Configuration
//!
//! Settings can come from code, a TOML document, or `TOPK_*` environment
//! variables. Whatever the source, [`EngineConfig::validate`] runs once when
//! the engine starts; there is no runtime reconfiguration.

use crate::error::ConfigError;
use crate::sketch::CountMinSketch;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_TOP_K: &str = "TOPK_K";
pub const ENV_EPSILON: &str = "TOPK_EPSILON";
pub const ENV_DELTA: &str = "TOPK_DELTA";
pub const ENV_FLUSH_INTERVAL_MS: &str = "TOPK_FLUSH_INTERVAL_MS";

/// Accuracy parameters and emission period for a [`crate::TopKEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of keys reported per flush (default: 10)
    pub top_k: usize,
    /// Overcount bound as a fraction of events per interval (default: 0.001)
    pub epsilon: f64,
    /// Probability the overcount bound is exceeded (default: 0.01)
    pub delta: f64,
    /// Emission period (default: 10 seconds)
    #[serde(rename = "flush_interval_ms", with = "duration_millis")]
    pub flush_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            top_k: 10,
            epsilon: 0.001,
            delta: 0.01,
            flush_interval: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    pub fn new(top_k: usize, epsilon: f64, delta: f64, flush_interval: Duration) -> Self {
        EngineConfig {
            top_k,
            epsilon,
            delta,
            flush_interval,
        }
    }

    /// Create config for testing (small sketch, fast flushes)
    pub fn test() -> Self {
        EngineConfig {
            top_k: 5,
            epsilon: 0.01,
            delta: 0.01,
            flush_interval: Duration::from_millis(50),
        }
    }

    /// Check every parameter, including that the implied sketch fits in memory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::InvalidTopK);
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }
        if !(self.delta > 0.0 && self.delta.is_finite()) {
            return Err(ConfigError::InvalidDelta(self.delta));
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::InvalidFlushInterval);
        }
        let depth = CountMinSketch::suggest_depth(self.delta);
        let width = CountMinSketch::suggest_width(self.epsilon);
        match depth.checked_mul(width) {
            Some(cells) if cells <= crate::sketch::MAX_COUNTERS => Ok(()),
            _ => Err(ConfigError::SketchTooLarge { depth, width }),
        }
    }

    /// Parse a TOML document; missing fields take their defaults.
    ///
    /// ```toml
    /// top_k = 20
    /// epsilon = 0.0005
    /// delta = 0.01
    /// flush_interval_ms = 5000
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from `TOPK_*` environment variables; unset variables take defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from any variable source, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = EngineConfig::default();
        Ok(EngineConfig {
            top_k: parse_var(&lookup, ENV_TOP_K)?.unwrap_or(defaults.top_k),
            epsilon: parse_var(&lookup, ENV_EPSILON)?.unwrap_or(defaults.epsilon),
            delta: parse_var(&lookup, ENV_DELTA)?.unwrap_or(defaults.delta),
            flush_interval: parse_var(&lookup, ENV_FLUSH_INTERVAL_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.flush_interval),
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
