//! Error types for callgate.

use thiserror::Error;

/// Main error type for callgate operations.
///
/// A rejected call is not an error; see [`crate::ratelimit::Outcome`].
#[derive(Error, Debug)]
pub enum CallgateError {
    /// Limiter parameters that cannot describe a usable window
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration source could not be loaded or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for CallgateError {
    fn from(err: config::ConfigError) -> Self {
        CallgateError::Config(err.to_string())
    }
}

/// Result type alias for callgate operations.
pub type Result<T> = std::result::Result<T, CallgateError>;
