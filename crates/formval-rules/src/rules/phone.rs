//! Tel and postal-code checks. Both share the same shape: normalize, check for
//! half-width digits, then apply the tri-state hyphen policy.

use super::{Outcome, Rule, text_or_fail};
use crate::context::RuleContext;
use crate::error::RuleResult;
use crate::model::is_empty;
use crate::normalize::normalize_number;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

builtin_regex!(half_width_re, r"^[0-9\-]+$");
builtin_regex!(postal_hyphenated_re, r"^\d{3}-\d{4}$");
builtin_regex!(postal_plain_re, r"^\d{7}$");
builtin_regex!(tel_hyphenated_re, r"^\d{2,5}-\d{1,4}-\d{3,4}$");
builtin_regex!(tel_plain_re, r"^\d{10,11}$");

struct Messages {
    default: &'static str,
    with_hyphens: &'static str,
    without_hyphens: &'static str,
    half_width: &'static str,
}

const HALF_WIDTH: &str = "半角数字で入力してください。";

const POSTAL_MESSAGES: Messages = Messages {
    default: "郵便番号の形式が正しくありません。",
    with_hyphens: "郵便番号はハイフン付きの形式で入力してください。",
    without_hyphens: "郵便番号はハイフンなしの形式で入力してください。",
    half_width: HALF_WIDTH,
};

const TEL_MESSAGES: Messages = Messages {
    default: "電話番号の形式が正しくありません。",
    with_hyphens: "電話番号はハイフン付きの形式で入力してください。",
    without_hyphens: "電話番号はハイフンなしの形式で入力してください。",
    half_width: HALF_WIDTH,
};

struct Shape {
    rule: &'static str,
    half_width_rule: &'static str,
    hyphenated: fn() -> &'static Regex,
    plain: fn() -> &'static Regex,
    messages: &'static Messages,
}

fn check_shape(shape: &Shape, value: &Value, ctx: &RuleContext) -> Outcome {
    if is_empty(value) {
        return Outcome::Pass;
    }
    let text = match text_or_fail(value, shape.rule, shape.messages.default, ctx) {
        Ok(text) => text,
        Err(outcome) => return outcome,
    };
    let normalized = normalize_number(&text);

    if !half_width_re().is_match(&normalized) {
        return Outcome::fail(
            shape.half_width_rule,
            ctx.message_for(shape.half_width_rule, shape.messages.half_width),
            value,
        );
    }

    let (ok, default_message) = match ctx.allow_hyphens {
        Some(true) => ((shape.hyphenated)().is_match(&normalized), shape.messages.with_hyphens),
        Some(false) => ((shape.plain)().is_match(&normalized), shape.messages.without_hyphens),
        None => (
            (shape.hyphenated)().is_match(&normalized) || (shape.plain)().is_match(&normalized),
            shape.messages.default,
        ),
    };
    if !ok {
        return Outcome::fail(shape.rule, ctx.message_for(shape.rule, default_message), value);
    }

    ctx.fire_lookup(&normalized);
    Outcome::PassWith(Value::String(normalized))
}

/// Japanese postal code: `123-4567` or `1234567`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostalCodeRule;

#[async_trait]
impl Rule for PostalCodeRule {
    async fn check(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome> {
        let shape = Shape {
            rule: "postal-code",
            half_width_rule: "postal-code-halfwidth",
            hyphenated: postal_hyphenated_re,
            plain: postal_plain_re,
            messages: &POSTAL_MESSAGES,
        };
        Ok(check_shape(&shape, value, ctx))
    }
}

/// Phone number: `03-1234-5678` style or 10-11 plain digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelRule;

#[async_trait]
impl Rule for TelRule {
    async fn check(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome> {
        let shape = Shape {
            rule: "tel",
            half_width_rule: "tel-halfwidth",
            hyphenated: tel_hyphenated_re,
            plain: tel_plain_re,
            messages: &TEL_MESSAGES,
        };
        Ok(check_shape(&shape, value, ctx))
    }
}
