//! Value types exchanged between rules, the registry and the state store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Tag of the rule that failed (e.g. `required`, `email-mismatch`).
    pub rule: String,
    /// User-facing message.
    pub message: String,
    /// The value that was checked.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<Value>,
}

impl ValidationError {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Attach the checked value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// Outcome of running a rule chain against one value.
///
/// `is_valid()` is true iff there are no errors; the constructors are the only
/// way to build one, so the two can never disagree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    is_valid: bool,
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// A passing result.
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// A failing result with a single error.
    pub fn failure(error: ValidationError) -> Self {
        Self {
            is_valid: false,
            errors: vec![error],
        }
    }

    /// Build a result from any number of errors (empty means success).
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Message of the first error, if any. This is what gets displayed.
    pub fn first_message(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }

    /// Combine two results: valid only if both are valid, errors concatenated.
    pub fn merge(mut self, other: Self) -> Self {
        self.errors.extend(other.errors);
        self.is_valid = self.errors.is_empty();
        self
    }
}

/// Returns `true` for null, whitespace-only strings, empty arrays and
/// property-less objects. Numbers and booleans are never empty.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Read a value as text. Only strings and numbers qualify.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
