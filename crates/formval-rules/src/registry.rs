//! Rule registry: name -> node factory, chain construction and execution.

use crate::context::{RuleContext, TextMode};
use crate::error::RuleResult;
use crate::model::{ValidationError, ValidationResult};
use crate::normalize::normalize_number;
use crate::rules::{
    CustomRule, EmailConfirmRule, EmailRule, Outcome, PostalCodeRule, Predicate, RequiredRule,
    Rule, TelRule, TextRule,
};
use async_trait::async_trait;
use futures_util::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Token that normalizes the value before the chain runs.
pub const REPLACE_TOKEN: &str = "replace";

/// Prefix of custom-message key tokens (e.g. `emesse1`).
pub const MESSAGE_KEY_PREFIX: &str = "emesse";

/// Tag of the failure reported when a node faults or panics.
pub const FAULT_TAG: &str = "validation-error";

/// Zero-argument constructor of a chain node.
pub type RuleFactory = Arc<dyn Fn() -> Arc<dyn Rule> + Send + Sync>;

/// Split a comma-separated rule list into trimmed, non-empty tokens.
pub fn parse_rules(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Anything accepted as a rule list: a comma-separated string or a list of
/// tokens.
pub trait IntoRuleList {
    fn into_rule_list(self) -> Vec<String>;
}

impl IntoRuleList for &str {
    fn into_rule_list(self) -> Vec<String> {
        parse_rules(self)
    }
}

impl IntoRuleList for String {
    fn into_rule_list(self) -> Vec<String> {
        parse_rules(&self)
    }
}

impl IntoRuleList for &String {
    fn into_rule_list(self) -> Vec<String> {
        parse_rules(self)
    }
}

impl IntoRuleList for &[&str] {
    fn into_rule_list(self) -> Vec<String> {
        self.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect()
    }
}

impl<const N: usize> IntoRuleList for [&str; N] {
    fn into_rule_list(self) -> Vec<String> {
        self.as_slice().into_rule_list()
    }
}

impl IntoRuleList for &[String] {
    fn into_rule_list(self) -> Vec<String> {
        self.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect()
    }
}

impl IntoRuleList for Vec<String> {
    fn into_rule_list(self) -> Vec<String> {
        self.as_slice().into_rule_list()
    }
}

/// Text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn fault(value: &Value, detail: &str) -> ValidationResult {
    ValidationResult::failure(
        ValidationError::new(FAULT_TAG, format!("バリデーションエラー: {detail}"))
            .with_value(value.clone()),
    )
}

struct ChainNode {
    name: String,
    rule: Arc<dyn Rule>,
}

/// An ordered list of nodes built from a rule list.
///
/// Each node sees the value handed on by the previous one and the context
/// merged with its own per-rule block. The first failure stops the chain.
pub struct Chain {
    nodes: Vec<ChainNode>,
}

impl Chain {
    /// Rule names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Run the chain and fold the outcome into a result.
    ///
    /// Faults and panics inside any node become a single `validation-error`
    /// failure; this never panics and never returns an error.
    pub async fn run(&self, value: &Value, ctx: &RuleContext) -> ValidationResult {
        match AssertUnwindSafe(self.check(value, ctx)).catch_unwind().await {
            Ok(Ok(Outcome::Fail(errors))) => ValidationResult::from_errors(errors),
            Ok(Ok(_)) => ValidationResult::success(),
            Ok(Err(err)) => {
                warn!(target: "formval.rules", error = %err, chain = ?self.names(), "rule fault");
                fault(value, &err.to_string())
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                warn!(target: "formval.rules", panic = %message, chain = ?self.names(), "rule panicked");
                fault(value, &message)
            }
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("names", &self.names()).finish()
    }
}

#[async_trait]
impl Rule for Chain {
    async fn check(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome> {
        let mut current = value.clone();
        for node in &self.nodes {
            let node_ctx = ctx.for_rule(&node.name);
            match node.rule.check(&current, &node_ctx).await? {
                Outcome::Pass => {}
                Outcome::PassWith(next) => current = next,
                Outcome::Fail(errors) => {
                    trace!(target: "formval.rules", rule = %node.name, "chain stopped");
                    return Ok(Outcome::Fail(errors));
                }
            }
        }
        Ok(Outcome::PassWith(current))
    }
}

/// Maps rule names to node factories.
#[derive(Clone)]
pub struct RuleRegistry {
    factories: HashMap<String, RuleFactory>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl RuleRegistry {
    /// A registry with the default rule set.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_factory("required", || Arc::new(RequiredRule));
        registry.register_factory("email", || Arc::new(EmailRule));
        registry.register_factory("email-conf", || Arc::new(EmailConfirmRule));
        registry.register_factory("tel", || Arc::new(TelRule));
        registry.register_factory("postal-code", || Arc::new(PostalCodeRule));
        for mode in [
            TextMode::Number,
            TextMode::Hiragana,
            TextMode::Katakana,
            TextMode::Password,
        ] {
            registry.register_factory(mode.token(), move || Arc::new(TextRule::new(mode)));
        }
        registry
    }

    /// A registry without any rules.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a node factory, replacing any existing one for `name`.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn Rule> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            debug!(target: "formval.rules", rule = %name, "rule factory replaced");
        }
        self
    }

    /// Register a [`CustomRule`] under `name`.
    pub fn register_custom(
        &mut self,
        name: impl Into<String>,
        predicate: Predicate,
        message: impl Into<String>,
    ) -> &mut Self {
        let rule: Arc<dyn Rule> = Arc::new(CustomRule::new(predicate).with_message(message));
        self.register_factory(name, move || Arc::clone(&rule))
    }

    /// Remove a rule. Returns `true` if it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the chain for `tokens`.
    ///
    /// `replace` is dropped, `emesse*` tokens set the context's custom-message
    /// key and unknown names are skipped. Returns `None` when no node remains.
    pub fn build_chain(&self, tokens: &[String], ctx: &mut RuleContext) -> Option<Chain> {
        let mut nodes = Vec::with_capacity(tokens.len());
        for token in tokens {
            if token == REPLACE_TOKEN {
                continue;
            }
            if token.starts_with(MESSAGE_KEY_PREFIX) {
                ctx.custom_message_key = Some(token.clone());
                continue;
            }
            match self.factories.get(token) {
                Some(factory) => nodes.push(ChainNode {
                    name: token.clone(),
                    rule: factory(),
                }),
                None => trace!(target: "formval.rules", rule = %token, "unknown rule ignored"),
            }
        }

        if nodes.is_empty() {
            return None;
        }
        let chain = Chain { nodes };
        debug!(target: "formval.rules", chain = ?chain.names(), "chain built");
        Some(chain)
    }

    /// Validate `value` against `rules`.
    ///
    /// The context is copied; its `validation_types` is set to the parsed
    /// token list. String values are normalized first when the list contains
    /// `replace`.
    pub async fn validate(
        &self,
        value: &Value,
        rules: impl IntoRuleList,
        ctx: &RuleContext,
    ) -> ValidationResult {
        let tokens = rules.into_rule_list();
        let mut ctx = ctx.clone();

        let value = match value {
            Value::String(s) if tokens.iter().any(|t| t == REPLACE_TOKEN) => {
                Value::String(normalize_number(s))
            }
            other => other.clone(),
        };

        let Some(chain) = self.build_chain(&tokens, &mut ctx) else {
            return ValidationResult::success();
        };
        ctx.validation_types = tokens;
        chain.run(&value, &ctx).await
    }
}
