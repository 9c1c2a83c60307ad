//! Options passed down a rule chain.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Callback fired with the normalized value after a tel / postal-code check
/// passes (e.g. to drive an address lookup). Not awaited by the chain.
pub type LookupFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Semantic type of a field, used to pick a canned "required" message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Name,
    FuriganaHiragana,
    FuriganaKatakana,
    PostalCode,
    /// Street address.
    Postal,
    Tel,
    Email,
    EmailConfirm,
    Password,
    /// Free text (inquiry body).
    Text,
    Checkbox,
    Radiobox,
    /// "I agree to the privacy policy" checkbox.
    Agree,
    Select,
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "name" => Self::Name,
            "furiganaHira" | "furigana-hiragana" => Self::FuriganaHiragana,
            "furiganaKana" | "furigana-katakana" => Self::FuriganaKatakana,
            "postalCode" | "postal-code" => Self::PostalCode,
            "postal" => Self::Postal,
            "tel" => Self::Tel,
            "email" => Self::Email,
            "emailConf" | "email-confirm" | "email-conf" => Self::EmailConfirm,
            "password" => Self::Password,
            "text" => Self::Text,
            "checkbox" => Self::Checkbox,
            "radiobox" | "radio" => Self::Radiobox,
            "agree" => Self::Agree,
            "select" => Self::Select,
            other => return Err(format!("unknown field type: {other}")),
        })
    }
}

/// Kind of the backing element (input `type`, or tag name otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementType {
    #[default]
    Text,
    Checkbox,
    Radio,
    Select,
    Textarea,
    Email,
    Tel,
    Password,
    Other,
}

impl ElementType {
    /// Map an input `type` attribute or tag name.
    pub fn from_html(kind: &str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "text" | "input" | "search" | "url" | "number" => Self::Text,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "select" | "select-one" | "select-multiple" => Self::Select,
            "textarea" => Self::Textarea,
            "email" => Self::Email,
            "tel" => Self::Tel,
            "password" => Self::Password,
            _ => Self::Other,
        }
    }
}

/// Mode of the text rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextMode {
    Number,
    HalfWidth,
    Hiragana,
    Katakana,
    Password,
}

impl TextMode {
    /// The rule token that selects this mode.
    pub fn token(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::HalfWidth => "halfWidth",
            Self::Hiragana => "hiragana",
            Self::Katakana => "katakana",
            Self::Password => "password",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "number" => Self::Number,
            "halfWidth" => Self::HalfWidth,
            "hiragana" => Self::Hiragana,
            "katakana" => Self::Katakana,
            "password" => Self::Password,
            _ => return None,
        })
    }
}

/// Per-rule configuration block, keyed by rule name (e.g. `tel`, `postal-code`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Hyphen policy: `true` = required, `false` = forbidden, unset = either.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_hyphens: Option<bool>,
    /// Message used when this rule fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Fire the lookup callback after a successful check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_lookup: Option<bool>,
}

impl RuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow_hyphens(mut self, allow: bool) -> Self {
        self.allow_hyphens = Some(allow);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_external_lookup(mut self, enabled: bool) -> Self {
        self.external_lookup = Some(enabled);
        self
    }
}

/// Every option a rule may consult.
///
/// Cloning is cheap: the dictionaries are shared.
#[derive(Clone, Default)]
pub struct RuleContext {
    /// Explicit message; wins over every other message source.
    pub message: Option<String>,
    /// Message dictionary keyed by rule name or custom-message key.
    pub custom_messages: Arc<BTreeMap<String, String>>,
    /// Custom-message key taken from an `emesse*` token.
    pub custom_message_key: Option<String>,
    /// The full token list of the current validation request.
    pub validation_types: Vec<String>,
    pub field_type: Option<FieldType>,
    pub element_type: Option<ElementType>,
    /// Overrides the mode of every text node in the chain.
    pub text_type: Option<TextMode>,
    pub allow_hyphens: Option<bool>,
    pub check_confirmation: bool,
    pub confirmation_value: Option<String>,
    pub mismatch_message: Option<String>,
    /// Value an `email-conf` field must equal.
    pub original_email: Option<String>,
    /// Live value of the form's primary email field, used when
    /// `original_email` is not given.
    pub fallback_email: Option<String>,
    pub external_lookup: bool,
    pub lookup: Option<LookupFn>,
    pub rule_options: Arc<BTreeMap<String, RuleConfig>>,
}

impl RuleContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_custom_messages(mut self, messages: BTreeMap<String, String>) -> Self {
        self.custom_messages = Arc::new(messages);
        self
    }

    pub fn with_field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn with_element_type(mut self, element_type: ElementType) -> Self {
        self.element_type = Some(element_type);
        self
    }

    pub fn with_text_type(mut self, mode: TextMode) -> Self {
        self.text_type = Some(mode);
        self
    }

    pub fn with_allow_hyphens(mut self, allow: Option<bool>) -> Self {
        self.allow_hyphens = allow;
        self
    }

    /// Require the value to equal `value` (email confirmation).
    pub fn with_confirmation(mut self, value: impl Into<String>) -> Self {
        self.check_confirmation = true;
        self.confirmation_value = Some(value.into());
        self
    }

    pub fn with_mismatch_message(mut self, message: impl Into<String>) -> Self {
        self.mismatch_message = Some(message.into());
        self
    }

    pub fn with_original_email(mut self, email: impl Into<String>) -> Self {
        self.original_email = Some(email.into());
        self
    }

    pub fn with_fallback_email(mut self, email: impl Into<String>) -> Self {
        self.fallback_email = Some(email.into());
        self
    }

    /// Enable the external lookup and set its callback.
    pub fn with_lookup<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.external_lookup = true;
        self.lookup = Some(Arc::new(f));
        self
    }

    pub fn with_rule_options(mut self, options: BTreeMap<String, RuleConfig>) -> Self {
        self.rule_options = Arc::new(options);
        self
    }

    /// Returns `true` if `token` appears in the current rule list.
    pub fn has_token(&self, token: &str) -> bool {
        self.validation_types.iter().any(|t| t == token)
    }

    /// Dictionary entry for the custom-message key, if both are present.
    pub fn keyed_message(&self) -> Option<&str> {
        let key = self.custom_message_key.as_deref()?;
        self.custom_messages.get(key).map(String::as_str)
    }

    /// Message for a failing rule: explicit message, then the custom-message
    /// key, then the dictionary entry for `rule`, then `default`.
    pub fn message_for(&self, rule: &str, default: &str) -> String {
        if let Some(m) = &self.message {
            return m.clone();
        }
        if let Some(m) = self.keyed_message() {
            return m.to_string();
        }
        if let Some(m) = self.custom_messages.get(rule) {
            return m.clone();
        }
        default.to_string()
    }

    /// Effective context for one chain node: the node's per-rule block
    /// merged over this context.
    pub fn for_rule(&self, name: &str) -> RuleContext {
        let mut ctx = self.clone();
        if let Some(cfg) = self.rule_options.get(name) {
            if cfg.allow_hyphens.is_some() {
                ctx.allow_hyphens = cfg.allow_hyphens;
            }
            if let Some(message) = &cfg.message {
                ctx.message = Some(message.clone());
            }
            if let Some(enabled) = cfg.external_lookup {
                ctx.external_lookup = enabled;
            }
        }
        ctx
    }

    /// Fire the lookup callback if enabled.
    pub(crate) fn fire_lookup(&self, normalized: &str) {
        if !self.external_lookup {
            return;
        }
        if let Some(lookup) = &self.lookup {
            lookup(normalized);
        }
    }
}

impl fmt::Debug for RuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleContext")
            .field("message", &self.message)
            .field("custom_message_key", &self.custom_message_key)
            .field("validation_types", &self.validation_types)
            .field("field_type", &self.field_type)
            .field("element_type", &self.element_type)
            .field("text_type", &self.text_type)
            .field("allow_hyphens", &self.allow_hyphens)
            .field("check_confirmation", &self.check_confirmation)
            .field("external_lookup", &self.external_lookup)
            .field("lookup", &self.lookup.as_ref().map(|_| "<fn>"))
            .finish_non_exhaustive()
    }
}
