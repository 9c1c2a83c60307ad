use super::{Outcome, Rule, text_or_fail};
use crate::context::{RuleContext, TextMode};
use crate::error::RuleResult;
use crate::model::is_empty;
use crate::normalize::normalize_number;
use async_trait::async_trait;
use serde_json::Value;

builtin_regex!(number_re, r"^[0-9０-９]+$");
builtin_regex!(half_width_re, r"^[0-9]+$");
builtin_regex!(hiragana_re, r"^[ぁ-んー　 ]+$");
builtin_regex!(katakana_re, r"^[ァ-ヶー　 ]+$");

const NUMBER: &str = "数字で入力してください。";
const HALF_WIDTH: &str = "半角数字で入力してください。";
const HIRAGANA: &str = "全角ひらがなで入力してください。";
const KATAKANA: &str = "全角カタカナで入力してください。";
const PASSWORD: &str = "半角英数字をそれぞれ含む8文字以上16文字以下で入力してください。";
const NOT_TEXT: &str = "文字列を入力してください。";

/// 8-16 ASCII letters and digits, with at least one of each.
pub fn is_password(s: &str) -> bool {
    let len = s.chars().count();
    (8..=16).contains(&len)
        && s.chars().all(|c| c.is_ascii_alphanumeric())
        && s.chars().any(|c| c.is_ascii_alphabetic())
        && s.chars().any(|c| c.is_ascii_digit())
}

/// Character-class checks: digits, half-width digits, hiragana, katakana and
/// passwords.
///
/// The mode is `ctx.text_type` when the caller sets one, otherwise the mode
/// the node was created with.
#[derive(Debug, Clone, Copy)]
pub struct TextRule {
    mode: TextMode,
}

impl TextRule {
    pub fn new(mode: TextMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> TextMode {
        self.mode
    }
}

fn check_mode(mode: TextMode, text: &str, value: &Value, ctx: &RuleContext) -> Option<Outcome> {
    let (ok, rule, default) = match mode {
        // `halfWidth` in the rule list tightens number mode to ASCII digits,
        // after folding full-width input.
        TextMode::Number if ctx.has_token("halfWidth") => (
            half_width_re().is_match(&normalize_number(text)),
            "halfwidth",
            HALF_WIDTH,
        ),
        TextMode::Number => (number_re().is_match(text), "number", NUMBER),
        TextMode::HalfWidth => (half_width_re().is_match(text), "halfwidth", HALF_WIDTH),
        TextMode::Hiragana => (hiragana_re().is_match(text), "hiragana", HIRAGANA),
        TextMode::Katakana => (katakana_re().is_match(text), "katakana", KATAKANA),
        TextMode::Password => (is_password(text), "password", PASSWORD),
    };
    (!ok).then(|| Outcome::fail(rule, ctx.message_for(rule, default), value))
}

#[async_trait]
impl Rule for TextRule {
    async fn check(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome> {
        if is_empty(value) {
            return Ok(Outcome::Pass);
        }
        let text = match text_or_fail(value, "text", NOT_TEXT, ctx) {
            Ok(text) => text,
            Err(outcome) => return Ok(outcome),
        };

        let mode = ctx.text_type.unwrap_or(self.mode);
        if let Some(failure) = check_mode(mode, &text, value, ctx) {
            return Ok(failure);
        }
        Ok(Outcome::PassWith(Value::String(text)))
    }
}
