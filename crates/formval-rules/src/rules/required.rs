use super::{Outcome, Rule};
use crate::context::{ElementType, FieldType, RuleContext};
use crate::error::RuleResult;
use crate::model::is_empty;
use async_trait::async_trait;
use serde_json::Value;

const DEFAULT: &str = "この項目は入力必須です。";
const NAME: &str = "お名前を入力してください。";
const FURIGANA_HIRAGANA: &str = "ふりがなを入力してください。";
const FURIGANA_KATAKANA: &str = "フリガナを入力してください。";
const POSTAL_CODE: &str = "郵便番号を入力してください。";
const ADDRESS: &str = "住所を入力してください。";
const TEL: &str = "電話番号を入力してください。";
const EMAIL: &str = "メールアドレスを入力してください。";
const EMAIL_CONFIRM: &str = "確認用メールアドレスを入力してください。";
const PASSWORD: &str = "パスワードを入力してください。";
const TEXT: &str = "お問い合わせ内容を入力してください。";
const CHECKBOX: &str = "チェックボックスを選択してください。";
const RADIOBOX: &str = "ラジオボタンを選択してください。";
const AGREE: &str = "個人情報保護方針の同意にチェックを入れてください。";
const SELECT: &str = "選択してください。";

fn canned(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Name => NAME,
        FieldType::FuriganaHiragana => FURIGANA_HIRAGANA,
        FieldType::FuriganaKatakana => FURIGANA_KATAKANA,
        FieldType::PostalCode => POSTAL_CODE,
        FieldType::Postal => ADDRESS,
        FieldType::Tel => TEL,
        FieldType::Email => EMAIL,
        FieldType::EmailConfirm => EMAIL_CONFIRM,
        FieldType::Password => PASSWORD,
        FieldType::Text => TEXT,
        FieldType::Checkbox => CHECKBOX,
        FieldType::Radiobox => RADIOBOX,
        FieldType::Agree => AGREE,
        FieldType::Select => SELECT,
    }
}

fn from_tokens(ctx: &RuleContext) -> Option<&'static str> {
    if ctx.has_token("name") {
        return Some(NAME);
    }
    if ctx.has_token("furigana") {
        if ctx.has_token("hiragana") {
            return Some(FURIGANA_HIRAGANA);
        }
        if ctx.has_token("katakana") {
            return Some(FURIGANA_KATAKANA);
        }
    }
    let table = [
        ("postal-code", POSTAL_CODE),
        ("postal", ADDRESS),
        ("tel", TEL),
        ("email-conf", EMAIL_CONFIRM),
        ("email", EMAIL),
        ("password", PASSWORD),
        ("text", TEXT),
        ("agree", AGREE),
    ];
    table
        .iter()
        .find(|(token, _)| ctx.has_token(token))
        .map(|(_, message)| *message)
}

/// Message reported when a required value is missing.
///
/// Priority: explicit message, custom-message key, field type, rule tokens,
/// element type, then the generic default.
pub fn required_message(ctx: &RuleContext) -> String {
    if let Some(m) = &ctx.message {
        return m.clone();
    }
    if let Some(m) = ctx.keyed_message() {
        return m.to_string();
    }
    if let Some(field_type) = ctx.field_type {
        return canned(field_type).to_string();
    }
    if let Some(m) = from_tokens(ctx) {
        return m.to_string();
    }
    match ctx.element_type {
        Some(ElementType::Checkbox) => CHECKBOX,
        Some(ElementType::Radio) => RADIOBOX,
        Some(ElementType::Select) => SELECT,
        _ => DEFAULT,
    }
    .to_string()
}

/// Fails on empty values (see [`is_empty`](crate::model::is_empty)).
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredRule;

#[async_trait]
impl Rule for RequiredRule {
    async fn check(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome> {
        if is_empty(value) {
            return Ok(Outcome::fail("required", required_message(ctx), value));
        }
        Ok(Outcome::Pass)
    }
}
