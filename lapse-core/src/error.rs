//! Error types for Lapse.
//!
//! Cache operations themselves never fail. These errors cover the surfaces
//! around the cache: loading configuration and scheduling background sweeps.

use thiserror::Error;

/// Result type alias using `LapseError`.
pub type Result<T> = std::result::Result<T, LapseError>;

/// Main error type for Lapse configuration and scheduling.
#[derive(Debug, Error)]
pub enum LapseError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration value out of range.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Environment variable present but not parseable.
    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnvVar { var: String, value: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // RUNTIME ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A background task was requested outside of a Tokio runtime.
    #[error("No Tokio runtime available to spawn the sweeper")]
    NoRuntime,

    /// The sweep task ended abnormally.
    #[error("Sweeper failed: {0}")]
    SweeperFailed(String),
}

impl LapseError {
    /// Returns true if this error stems from bad configuration input.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LapseError::ConfigError(_)
                | LapseError::InvalidEnvVar { .. }
                | LapseError::JsonError(_)
                | LapseError::IoError(_)
        )
    }

    /// Returns true if this error comes from the background runtime.
    pub fn is_runtime_error(&self) -> bool {
        matches!(self, LapseError::NoRuntime | LapseError::SweeperFailed(_))
    }
}
