//! Error types for Wavebound.

use thiserror::Error;

/// Top-level error type for Wavebound operations that touch the outside world.
#[derive(Debug, Error)]
pub enum WaveboundError {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A value lies outside its accepted range
    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        /// Dotted path of the offending field
        field: &'static str,
        /// Value found
        value: f64,
        /// Human-readable accepted range
        expected: &'static str,
    },

    /// A referenced name does not exist
    #[error("unknown {kind}: {name}")]
    UnknownName {
        /// What was being looked up
        kind: &'static str,
        /// The name that failed to resolve
        name: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::OutOfRange`].
    #[must_use]
    pub fn out_of_range(field: &'static str, value: impl Into<f64>, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value: value.into(),
            expected,
        }
    }
}

/// Result type alias for Wavebound operations.
pub type WaveboundResult<T> = Result<T, WaveboundError>;

/// Result type alias for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;
