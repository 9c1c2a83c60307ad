use super::{Outcome, Rule, text_or_fail};
use crate::context::RuleContext;
use crate::error::RuleResult;
use crate::model::is_empty;
use async_trait::async_trait;
use serde_json::Value;

const FORMAT_MESSAGE: &str = "メールアドレスの形式が正しくありません。";
const MISMATCH_MESSAGE: &str = "メールアドレスが一致しません。";

builtin_regex!(
    email_re,
    r"^[a-zA-Z0-9][a-zA-Z0-9._-]*@[a-zA-Z0-9_-]+(\.[a-zA-Z0-9_-]+)+$"
);

/// Best-effort address shape check: `local@domain.tld`.
///
/// Not RFC 5322; the local part must start with an alphanumeric and the
/// domain needs at least one dot.
pub fn is_email(s: &str) -> bool {
    email_re().is_match(s)
}

/// Email format check, with an optional confirmation comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailRule;

#[async_trait]
impl Rule for EmailRule {
    async fn check(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome> {
        if is_empty(value) {
            return Ok(Outcome::Pass);
        }
        let text = match text_or_fail(value, "email", FORMAT_MESSAGE, ctx) {
            Ok(text) => text,
            Err(outcome) => return Ok(outcome),
        };

        if !is_email(&text) {
            return Ok(Outcome::fail("email", ctx.message_for("email", FORMAT_MESSAGE), value));
        }

        if ctx.check_confirmation {
            if let Some(expected) = ctx.confirmation_value.as_deref().filter(|v| !v.is_empty()) {
                if text != expected {
                    let message = ctx
                        .mismatch_message
                        .clone()
                        .unwrap_or_else(|| MISMATCH_MESSAGE.to_string());
                    return Ok(Outcome::fail("email-mismatch", message, value));
                }
            }
        }

        Ok(Outcome::PassWith(Value::String(text)))
    }
}

/// Confirmation field: must equal the original address.
///
/// The comparison target is `original_email`, falling back to the live value
/// of the form's email field (`fallback_email`). With neither, the check
/// passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailConfirmRule;

#[async_trait]
impl Rule for EmailConfirmRule {
    async fn check(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome> {
        if is_empty(value) {
            return Ok(Outcome::Pass);
        }
        let text = match text_or_fail(value, "email-conf", MISMATCH_MESSAGE, ctx) {
            Ok(text) => text,
            Err(outcome) => return Ok(outcome),
        };

        let target = ctx
            .original_email
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(ctx.fallback_email.as_deref());

        if let Some(original) = target {
            if text != original {
                return Ok(Outcome::fail(
                    "email-conf",
                    ctx.message_for("email-conf", MISMATCH_MESSAGE),
                    value,
                ));
            }
        }

        Ok(Outcome::PassWith(Value::String(text)))
    }
}
