//! Error types for formval

use thiserror::Error;

/// Result type alias for formval operations
pub type FormResult<T> = Result<T, FormError>;

/// Errors raised while loading configuration.
///
/// Validation itself never fails with an error: bad values are reported as
/// field state, and rule faults are turned into `validation-error` results.
#[derive(Debug, Error)]
pub enum FormError {
    /// Configuration value out of range or inconsistent
    #[error("Config error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
