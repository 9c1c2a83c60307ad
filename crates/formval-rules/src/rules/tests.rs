use super::*;
use crate::context::{ElementType, FieldType, TextMode};
use crate::error::RuleError;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

fn tokens(list: &[&str]) -> RuleContext {
    RuleContext {
        validation_types: list.iter().map(|s| s.to_string()).collect(),
        ..RuleContext::default()
    }
}

fn failed_rule(outcome: &Outcome) -> Option<&str> {
    match outcome {
        Outcome::Fail(errors) => errors.first().map(|e| e.rule.as_str()),
        _ => None,
    }
}

fn failed_message(outcome: &Outcome) -> Option<&str> {
    match outcome {
        Outcome::Fail(errors) => errors.first().map(|e| e.message.as_str()),
        _ => None,
    }
}

#[tokio::test]
async fn required_fails_on_empty_values() {
    let ctx = RuleContext::default();
    for v in [json!(null), json!(""), json!("   "), json!([]), json!({})] {
        let out = RequiredRule.check(&v, &ctx).await.unwrap();
        assert_eq!(failed_rule(&out), Some("required"), "{v}");
    }
    for v in [json!("0"), json!(0), json!(true), json!("x")] {
        let out = RequiredRule.check(&v, &ctx).await.unwrap();
        assert_eq!(out, Outcome::Pass, "{v}");
    }
}

#[tokio::test]
async fn required_failure_carries_the_value() {
    let out = RequiredRule.check(&json!("  "), &RuleContext::default()).await.unwrap();
    let Outcome::Fail(errors) = out else {
        panic!("expected failure");
    };
    assert_eq!(errors[0].value, Some(json!("  ")));
}

#[test]
fn required_message_priority() {
    assert_eq!(required_message(&RuleContext::default()), "この項目は入力必須です。");

    let by_element = RuleContext::default().with_element_type(ElementType::Radio);
    assert_eq!(required_message(&by_element), "ラジオボタンを選択してください。");

    let by_tokens = RuleContext {
        element_type: Some(ElementType::Checkbox),
        ..tokens(&["required", "agree"])
    };
    assert_eq!(
        required_message(&by_tokens),
        "個人情報保護方針の同意にチェックを入れてください。"
    );

    let by_type = RuleContext {
        field_type: Some(FieldType::Tel),
        ..tokens(&["required", "email"])
    };
    assert_eq!(required_message(&by_type), "電話番号を入力してください。");

    let mut messages = BTreeMap::new();
    messages.insert("emesse1".to_string(), "keyed".to_string());
    let keyed = RuleContext {
        custom_message_key: Some("emesse1".into()),
        ..by_type.clone().with_custom_messages(messages)
    };
    assert_eq!(required_message(&keyed), "keyed");

    let explicit = keyed.with_message("explicit");
    assert_eq!(required_message(&explicit), "explicit");
}

#[test]
fn required_message_furigana_tokens() {
    assert_eq!(
        required_message(&tokens(&["required", "furigana", "katakana"])),
        "フリガナを入力してください。"
    );
    assert_eq!(
        required_message(&tokens(&["required", "furigana", "hiragana"])),
        "ふりがなを入力してください。"
    );
    // email-conf is checked before email.
    assert_eq!(
        required_message(&tokens(&["required", "email", "email-conf"])),
        "確認用メールアドレスを入力してください。"
    );
}

#[test]
fn email_shape() {
    assert!(is_email("a@b.co"));
    assert!(is_email("first.last@mail.example.jp"));
    assert!(!is_email("a@b"));
    assert!(!is_email(".a@b.co"));
    assert!(!is_email("not-an-email"));
}

#[tokio::test]
async fn email_format_and_passthrough() {
    let ctx = RuleContext::default();
    assert_eq!(
        EmailRule.check(&json!("a@b.co"), &ctx).await.unwrap(),
        Outcome::PassWith(json!("a@b.co"))
    );

    let out = EmailRule.check(&json!("a@b"), &ctx).await.unwrap();
    assert_eq!(failed_rule(&out), Some("email"));
    assert_eq!(failed_message(&out), Some("メールアドレスの形式が正しくありません。"));

    assert_eq!(EmailRule.check(&json!(""), &ctx).await.unwrap(), Outcome::Pass);

    let out = EmailRule.check(&json!(true), &ctx).await.unwrap();
    assert_eq!(failed_rule(&out), Some("email"));
}

#[tokio::test]
async fn email_confirmation_mismatch() {
    let ctx = RuleContext::default().with_confirmation("other@b.co");
    let out = EmailRule.check(&json!("a@b.co"), &ctx).await.unwrap();
    assert_eq!(failed_rule(&out), Some("email-mismatch"));
    assert_eq!(failed_message(&out), Some("メールアドレスが一致しません。"));

    let ctx = ctx.with_mismatch_message("違います");
    let out = EmailRule.check(&json!("a@b.co"), &ctx).await.unwrap();
    assert_eq!(failed_message(&out), Some("違います"));

    let same = RuleContext::default().with_confirmation("a@b.co");
    assert!(!EmailRule.check(&json!("a@b.co"), &same).await.unwrap().is_fail());

    // An empty target disables the comparison.
    let blank = RuleContext::default().with_confirmation("");
    assert!(!EmailRule.check(&json!("a@b.co"), &blank).await.unwrap().is_fail());
}

#[tokio::test]
async fn email_confirm_targets() {
    let original = RuleContext::default().with_original_email("a@b.co");
    let out = EmailConfirmRule.check(&json!("x@b.co"), &original).await.unwrap();
    assert_eq!(failed_rule(&out), Some("email-conf"));
    assert!(!EmailConfirmRule.check(&json!("a@b.co"), &original).await.unwrap().is_fail());

    let fallback = RuleContext::default()
        .with_original_email("")
        .with_fallback_email("live@b.co");
    assert!(!EmailConfirmRule.check(&json!("live@b.co"), &fallback).await.unwrap().is_fail());
    assert!(EmailConfirmRule.check(&json!("a@b.co"), &fallback).await.unwrap().is_fail());

    let none = RuleContext::default();
    assert!(!EmailConfirmRule.check(&json!("anything"), &none).await.unwrap().is_fail());
}

#[tokio::test]
async fn postal_code_hyphen_policy() {
    let either = RuleContext::default();
    let with = RuleContext::default().with_allow_hyphens(Some(true));
    let without = RuleContext::default().with_allow_hyphens(Some(false));

    assert!(!PostalCodeRule.check(&json!("123-4567"), &either).await.unwrap().is_fail());
    assert!(!PostalCodeRule.check(&json!("1234567"), &either).await.unwrap().is_fail());

    let out = PostalCodeRule.check(&json!("123-4567"), &without).await.unwrap();
    assert_eq!(failed_rule(&out), Some("postal-code"));
    assert_eq!(
        failed_message(&out),
        Some("郵便番号はハイフンなしの形式で入力してください。")
    );

    let out = PostalCodeRule.check(&json!("1234567"), &with).await.unwrap();
    assert_eq!(failed_rule(&out), Some("postal-code"));
    assert!(!PostalCodeRule.check(&json!("123-4567"), &with).await.unwrap().is_fail());

    let out = PostalCodeRule.check(&json!("12-34567"), &either).await.unwrap();
    assert_eq!(failed_message(&out), Some("郵便番号の形式が正しくありません。"));
}

#[tokio::test]
async fn postal_code_full_width_matches_half_width() {
    for allow in [None, Some(true), Some(false)] {
        let ctx = RuleContext::default().with_allow_hyphens(allow);
        let full = PostalCodeRule.check(&json!("１２３－４５６７"), &ctx).await.unwrap();
        let half = PostalCodeRule.check(&json!("123-4567"), &ctx).await.unwrap();
        assert_eq!(full.is_fail(), half.is_fail(), "allow_hyphens = {allow:?}");
    }
    let out = PostalCodeRule
        .check(&json!("１２３－４５６７"), &RuleContext::default())
        .await
        .unwrap();
    assert_eq!(out, Outcome::PassWith(json!("123-4567")));
}

#[tokio::test]
async fn postal_code_rejects_letters_as_halfwidth() {
    let out = PostalCodeRule
        .check(&json!("123-abcd"), &RuleContext::default())
        .await
        .unwrap();
    assert_eq!(failed_rule(&out), Some("postal-code-halfwidth"));
}

#[tokio::test]
async fn tel_shapes() {
    let ctx = RuleContext::default();
    for ok in ["03-1234-5678", "0312345678", "090-1234-5678", "09012345678"] {
        assert!(!TelRule.check(&json!(ok), &ctx).await.unwrap().is_fail(), "{ok}");
    }
    for bad in ["03-12345678-1", "031234", "0-1-2"] {
        let out = TelRule.check(&json!(bad), &ctx).await.unwrap();
        assert_eq!(failed_rule(&out), Some("tel"), "{bad}");
    }
    let out = TelRule.check(&json!("03(1234)5678"), &ctx).await.unwrap();
    assert_eq!(failed_rule(&out), Some("tel-halfwidth"));

    let without = ctx.with_allow_hyphens(Some(false));
    assert!(TelRule.check(&json!("03-1234-5678"), &without).await.unwrap().is_fail());
}

#[tokio::test]
async fn lookup_fires_with_normalized_value_on_success_only() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let ctx = RuleContext::default().with_lookup(move |v| sink.lock().unwrap().push(v.to_string()));

    TelRule.check(&json!("０３－１２３４－５６７８"), &ctx).await.unwrap();
    TelRule.check(&json!("bad"), &ctx).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["03-1234-5678".to_string()]);

    let disabled = RuleContext {
        external_lookup: false,
        ..ctx
    };
    PostalCodeRule.check(&json!("1234567"), &disabled).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn password_shape() {
    assert!(is_password("abc12345"));
    assert!(is_password("ABCDEFG1"));
    assert!(!is_password("abcdefgh"));
    assert!(!is_password("12345678"));
    assert!(!is_password("abc1234"));
    assert!(!is_password("abcdefgh12345678x"));
    assert!(!is_password("abc-12345"));
}

#[tokio::test]
async fn text_modes() {
    let ctx = RuleContext::default();
    let cases = [
        (TextMode::Number, "０１２3", true),
        (TextMode::Number, "12a", false),
        (TextMode::HalfWidth, "0123", true),
        (TextMode::HalfWidth, "０１２３", false),
        (TextMode::Hiragana, "やまだ　たろう", true),
        (TextMode::Hiragana, "ヤマダ", false),
        (TextMode::Katakana, "ヤマダ タロー", true),
        (TextMode::Katakana, "やまだ", false),
        (TextMode::Password, "abc12345", true),
        (TextMode::Password, "abcdefgh", false),
    ];
    for (mode, input, passes) in cases {
        let out = TextRule::new(mode).check(&json!(input), &ctx).await.unwrap();
        assert_eq!(!out.is_fail(), passes, "{mode:?} {input}");
        if !passes {
            assert_eq!(failed_rule(&out), Some(mode_tag(mode)));
        }
    }
}

fn mode_tag(mode: TextMode) -> &'static str {
    match mode {
        TextMode::Number => "number",
        TextMode::HalfWidth => "halfwidth",
        TextMode::Hiragana => "hiragana",
        TextMode::Katakana => "katakana",
        TextMode::Password => "password",
    }
}

#[tokio::test]
async fn number_mode_tightens_with_halfwidth_token() {
    let rule = TextRule::new(TextMode::Number);
    let ctx = tokens(&["number", "halfWidth"]);
    assert!(!rule.check(&json!("１２３"), &ctx).await.unwrap().is_fail());

    let out = rule.check(&json!("12a"), &ctx).await.unwrap();
    assert_eq!(failed_rule(&out), Some("halfwidth"));
    assert_eq!(failed_message(&out), Some("半角数字で入力してください。"));
}

#[tokio::test]
async fn text_type_option_overrides_node_mode() {
    let rule = TextRule::new(TextMode::Number);
    let ctx = RuleContext::default().with_text_type(TextMode::Katakana);
    assert!(!rule.check(&json!("カタカナ"), &ctx).await.unwrap().is_fail());
    assert_eq!(rule.mode(), TextMode::Number);
}

#[tokio::test]
async fn text_uses_dictionary_message_by_rule_name() {
    let mut messages = BTreeMap::new();
    messages.insert("hiragana".to_string(), "ひらがなのみ".to_string());
    let ctx = RuleContext::default().with_custom_messages(messages);
    let out = TextRule::new(TextMode::Hiragana)
        .check(&json!("abc"), &ctx)
        .await
        .unwrap();
    assert_eq!(failed_message(&out), Some("ひらがなのみ"));
}

#[tokio::test]
async fn custom_rule_sync_and_async() {
    let ctx = RuleContext::default();
    let even = CustomRule::new(Predicate::new(|v, _| Ok(v.as_i64().is_some_and(|n| n % 2 == 0))))
        .with_message("偶数を入力してください。");
    assert_eq!(even.check(&json!(4), &ctx).await.unwrap(), Outcome::Pass);
    let out = even.check(&json!(3), &ctx).await.unwrap();
    assert_eq!(failed_rule(&out), Some("custom"));
    assert_eq!(failed_message(&out), Some("偶数を入力してください。"));

    let taken = CustomRule::new(Predicate::from_async(|v, _| async move {
        tokio::task::yield_now().await;
        Ok(v != json!("taken"))
    }));
    let out = taken.check(&json!("taken"), &ctx).await.unwrap();
    assert_eq!(failed_message(&out), Some("カスタムバリデーションエラー"));

    let out = taken.check(&json!("taken"), &ctx.clone().with_message("使用済み")).await.unwrap();
    assert_eq!(failed_message(&out), Some("使用済み"));
}

#[tokio::test]
async fn custom_rule_error_becomes_custom_error() {
    let failing = CustomRule::new(Predicate::new(|_, _| Err(RuleError::predicate("boom"))));
    let out = failing.check(&json!("x"), &RuleContext::default()).await.unwrap();
    assert_eq!(failed_rule(&out), Some("custom-error"));
    assert_eq!(failed_message(&out), Some("バリデーションエラー: boom"));
}

#[tokio::test]
async fn composite_collects_every_failure() {
    let ctx = RuleContext::default();
    let composite = CompositeRule::new()
        .add(EmailRule)
        .add(CustomRule::new(Predicate::new(|v, _| {
            Ok(v.as_str().is_some_and(|s| s.len() > 5))
        })))
        .add(RequiredRule);
    assert_eq!(composite.len(), 3);

    let Outcome::Fail(errors) = composite.check(&json!("x"), &ctx).await.unwrap() else {
        panic!("expected failure");
    };
    let rules: Vec<_> = errors.iter().map(|e| e.rule.as_str()).collect();
    assert_eq!(rules, ["email", "custom"]);

    assert_eq!(
        composite.check(&json!("user@example.com"), &ctx).await.unwrap(),
        Outcome::Pass
    );
    assert_eq!(CompositeRule::new().check(&json!(""), &ctx).await.unwrap(), Outcome::Pass);
}

#[tokio::test]
async fn conditional_runs_wrapped_rule_only_when_condition_holds() {
    let ctx = RuleContext::default();
    let only_strings = ConditionalRule::new(Predicate::new(|v, _| Ok(v.is_string())), EmailRule);

    assert_eq!(only_strings.check(&json!(12), &ctx).await.unwrap(), Outcome::Pass);
    let out = only_strings.check(&json!("nope"), &ctx).await.unwrap();
    assert_eq!(failed_rule(&out), Some("email"));
    assert_eq!(
        only_strings.check(&json!("a@b.co"), &ctx).await.unwrap(),
        Outcome::Pass
    );
}

#[tokio::test]
async fn conditional_predicate_error() {
    let broken = ConditionalRule::new(
        Predicate::new(|_, _| Err(RuleError::from("no flag"))),
        RequiredRule,
    );
    let out = broken.check(&json!(""), &RuleContext::default()).await.unwrap();
    assert_eq!(failed_rule(&out), Some("conditional-error"));
    assert_eq!(failed_message(&out), Some("条件チェックエラー: no flag"));
}

struct Unreachable;

#[async_trait::async_trait]
impl Rule for Unreachable {
    async fn check(&self, _value: &Value, _ctx: &RuleContext) -> RuleResult<Outcome> {
        Err(RuleError::from("backend down"))
    }
}

#[tokio::test]
async fn conditional_wrapped_rule_error() {
    let guarded = ConditionalRule::new(Predicate::new(|_, _| Ok(true)), Unreachable);
    let out = guarded.check(&json!("x"), &RuleContext::default()).await.unwrap();
    assert_eq!(failed_rule(&out), Some("conditional-error"));
    assert_eq!(failed_message(&out), Some("条件チェックエラー: backend down"));

    let skipped = ConditionalRule::new(Predicate::new(|_, _| Ok(false)), Unreachable);
    assert_eq!(
        skipped.check(&json!("x"), &RuleContext::default()).await.unwrap(),
        Outcome::Pass
    );
}
