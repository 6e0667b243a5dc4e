//! Error types for the Top-K engine
//!
//! - [`ConfigError`]: rejected at construction, never raised afterwards
//! - [`MalformedKeyError`]: an encoded key that does not follow the codec grammar
//! - [`EngineError`]: terminal failures of the background flush loop

use thiserror::Error;

/// Invalid engine or sketch configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("top_k must be positive")]
    InvalidTopK,

    #[error("epsilon must be a positive finite number, got {0}")]
    InvalidEpsilon(f64),

    #[error("delta must be a positive finite number, got {0}")]
    InvalidDelta(f64),

    #[error("flush interval must be positive")]
    InvalidFlushInterval,

    #[error("sketch dimensions must be positive, got depth={depth} width={width}")]
    InvalidDimensions { depth: usize, width: usize },

    #[error("sketch of {depth}x{width} counters exceeds the supported size")]
    SketchTooLarge { depth: usize, width: usize },

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("invalid value {value:?} for environment variable {var}")]
    Env { var: &'static str, value: String },
}

/// An encoded key that could not be decoded back into an identity.
///
/// Keys only ever come from [`crate::metrics::MetricKeyEncoder::encode`], so this
/// signals a broken encode/decode pairing rather than bad user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed metric key {key:?}: {reason}")]
pub struct MalformedKeyError {
    pub key: String,
    pub reason: &'static str,
}

impl MalformedKeyError {
    pub(crate) fn new(key: &str, reason: &'static str) -> Self {
        MalformedKeyError {
            key: key.to_string(),
            reason,
        }
    }
}

/// Failure that terminated the flush loop
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("internal key corruption during flush: {0}")]
    MalformedKey(#[from] MalformedKeyError),

    #[error("flush task failed: {0}")]
    TaskFailed(String),
}
