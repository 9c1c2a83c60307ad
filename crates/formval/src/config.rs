//! Form configuration.
//!
//! Built with `with_*` methods or loaded from TOML / JSON. Every section is
//! optional and unknown keys are rejected.

use crate::error::{FormError, FormResult};
use formval_rules::RuleConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Attribute that marks an element (and its subtree) as excluded from
/// validation.
pub const DEFAULT_HIDDEN_MARKER: &str = "data-validate-hidden";

/// When field events trigger validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Validate (debounced) on every input event. Default `false`.
    pub validate_on_input: bool,
    /// Validate when a field loses focus. Default `true`.
    pub validate_on_blur: bool,
    /// Delay before a debounced input validation starts.
    pub debounce_delay_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            validate_on_input: false,
            validate_on_blur: true,
            debounce_delay_ms: 300,
        }
    }
}

/// How errors reach the presenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ErrorDisplayConfig {
    /// Show or clear the field error after each validation. Default `true`.
    pub show_on_validation: bool,
    /// Clear the field error when it gains focus. Default `true`.
    pub clear_on_focus: bool,
}

impl Default for ErrorDisplayConfig {
    fn default() -> Self {
        Self {
            show_on_validation: true,
            clear_on_focus: true,
        }
    }
}

/// Configuration of a [`FormSession`](crate::FormSession).
///
/// Build it with the `with_*` methods, or load it from TOML / JSON:
///
/// ```toml
/// disable_submit_until_valid = true
///
/// [validation]
/// validate_on_input = true
/// debounce_delay_ms = 150
///
/// [custom_messages]
/// emesse1 = "会社名を入力してください。"
///
/// [rules.tel]
/// allow_hyphens = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormConfig {
    pub validation: ValidationConfig,
    pub error_display: ErrorDisplayConfig,
    /// Messages keyed by rule name or custom-message key.
    pub custom_messages: BTreeMap<String, String>,
    /// Per-rule options keyed by rule name.
    pub rules: BTreeMap<String, RuleConfig>,
    /// Drive the presenter's submit control from readiness.
    pub disable_submit_until_valid: bool,
    pub hidden_marker: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            validation: ValidationConfig::default(),
            error_display: ErrorDisplayConfig::default(),
            custom_messages: BTreeMap::new(),
            rules: BTreeMap::new(),
            disable_submit_until_valid: false,
            hidden_marker: DEFAULT_HIDDEN_MARKER.to_string(),
        }
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and check a TOML document.
    pub fn from_toml_str(input: &str) -> FormResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validated()
    }

    /// Parse and check a JSON document.
    pub fn from_json_str(input: &str) -> FormResult<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.validated()
    }

    fn validated(self) -> FormResult<Self> {
        if self.hidden_marker.trim().is_empty() {
            return Err(FormError::config("hidden_marker must not be empty"));
        }
        Ok(self)
    }

    pub fn with_validate_on_input(mut self, enabled: bool) -> Self {
        self.validation.validate_on_input = enabled;
        self
    }

    pub fn with_validate_on_blur(mut self, enabled: bool) -> Self {
        self.validation.validate_on_blur = enabled;
        self
    }

    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.validation.debounce_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_show_on_validation(mut self, enabled: bool) -> Self {
        self.error_display.show_on_validation = enabled;
        self
    }

    pub fn with_clear_on_focus(mut self, enabled: bool) -> Self {
        self.error_display.clear_on_focus = enabled;
        self
    }

    /// Add one entry to the message dictionary.
    pub fn with_custom_message(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.custom_messages.insert(key.into(), message.into());
        self
    }

    /// Set the options block for one rule.
    pub fn with_rule_config(mut self, rule: impl Into<String>, config: RuleConfig) -> Self {
        self.rules.insert(rule.into(), config);
        self
    }

    pub fn with_disable_submit_until_valid(mut self, enabled: bool) -> Self {
        self.disable_submit_until_valid = enabled;
        self
    }

    pub fn with_hidden_marker(mut self, marker: impl Into<String>) -> Self {
        self.hidden_marker = marker.into();
        self
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.validation.debounce_delay_ms)
    }
}
