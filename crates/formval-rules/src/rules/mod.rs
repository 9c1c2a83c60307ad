//! Chain nodes.
//!
//! Each rule looks at one value and either passes (optionally handing a
//! normalized value to the rest of the chain) or fails with errors. A failing
//! rule stops the chain; only [`CompositeRule`] deliberately collects the
//! failures of several children.
//!
//! Rules other than [`RequiredRule`] pass empty values through untouched, so
//! emptiness is reported once, by the required check.

/// Declare a function returning a lazily compiled built-in regex.
macro_rules! builtin_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static regex::Regex {
            static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            RE.get_or_init(|| regex::Regex::new($pattern).expect("invalid built-in regex"))
        }
    };
}

mod custom;
mod email;
mod phone;
mod required;
mod text;

#[cfg(test)]
mod tests;

pub use custom::{CompositeRule, ConditionalRule, CustomRule, Predicate};
pub use email::{EmailConfirmRule, EmailRule, is_email};
pub use phone::{PostalCodeRule, TelRule};
pub use required::{RequiredRule, required_message};
pub use text::{TextRule, is_password};

use crate::context::RuleContext;
use crate::error::RuleResult;
use crate::model::{ValidationError, as_text};
use async_trait::async_trait;
use serde_json::Value;

/// What a rule decided about a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Continue with the same value.
    Pass,
    /// Continue, handing this (normalized) value to the next rule.
    PassWith(Value),
    /// Stop the chain.
    Fail(Vec<ValidationError>),
}

impl Outcome {
    /// Fail with one error carrying the checked value.
    pub fn fail(rule: &str, message: impl Into<String>, value: &Value) -> Self {
        Outcome::Fail(vec![ValidationError::new(rule, message).with_value(value.clone())])
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Outcome::Fail(_))
    }
}

/// One executable check.
///
/// `check` is async so custom rules can await (e.g. a server-side uniqueness
/// lookup). Returning `Err` is a fault, not a failed check; the registry
/// reports it as a `validation-error`.
#[async_trait]
pub trait Rule: Send + Sync {
    async fn check(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome>;
}

/// Read `value` as text, or produce the failure a rule reports for values that
/// are neither strings nor numbers.
pub(crate) fn text_or_fail(
    value: &Value,
    rule: &str,
    default_message: &str,
    ctx: &RuleContext,
) -> Result<String, Outcome> {
    as_text(value).ok_or_else(|| Outcome::fail(rule, ctx.message_for(rule, default_message), value))
}
