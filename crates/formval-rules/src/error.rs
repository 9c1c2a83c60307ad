//! Error types for formval-rules

use thiserror::Error;

/// Result type for rule execution.
pub type RuleResult<T> = Result<T, RuleError>;

/// Faults raised while running a rule.
///
/// These are not validation failures: a rule that finds a bad value returns
/// [`Outcome::Fail`](crate::rules::Outcome::Fail). A `RuleError` means the rule
/// itself could not decide, and the registry turns it into a single
/// `validation-error` result.
#[derive(Debug, Clone, Error)]
pub enum RuleError {
    /// A user-supplied predicate failed.
    #[error("{0}")]
    Predicate(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl RuleError {
    /// Create a predicate error
    pub fn predicate(message: impl Into<String>) -> Self {
        Self::Predicate(message.into())
    }

    /// Check if this is a predicate error
    pub fn is_predicate(&self) -> bool {
        matches!(self, Self::Predicate(_))
    }
}

impl From<String> for RuleError {
    fn from(message: String) -> Self {
        Self::Other(message)
    }
}

impl From<&str> for RuleError {
    fn from(message: &str) -> Self {
        Self::Other(message.to_string())
    }
}
