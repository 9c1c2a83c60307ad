//! User-defined rules and rule combinators.

use super::{Outcome, Rule};
use crate::context::RuleContext;
use crate::error::RuleResult;
use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

const CUSTOM_MESSAGE: &str = "カスタムバリデーションエラー";

/// A sync-or-async boolean test over a value.
///
/// Receives owned copies so async predicates can hold them across awaits.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(Value, RuleContext) -> BoxFuture<'static, RuleResult<bool>> + Send + Sync>);

impl Predicate {
    /// Wrap a synchronous test.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &RuleContext) -> RuleResult<bool> + Send + Sync + 'static,
    {
        Self(Arc::new(move |value, ctx| {
            let out = f(&value, &ctx);
            async move { out }.boxed()
        }))
    }

    /// Wrap an asynchronous test.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, RuleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RuleResult<bool>> + Send + 'static,
    {
        Self(Arc::new(move |value, ctx| f(value, ctx).boxed()))
    }

    pub async fn test(&self, value: &Value, ctx: &RuleContext) -> RuleResult<bool> {
        (self.0)(value.clone(), ctx.clone()).await
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(<fn>)")
    }
}

/// Runs a user predicate. `false` fails with tag `custom`; an `Err` from the
/// predicate fails with tag `custom-error`.
#[derive(Debug, Clone)]
pub struct CustomRule {
    predicate: Predicate,
    message: String,
}

impl CustomRule {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            message: CUSTOM_MESSAGE.to_string(),
        }
    }

    /// Default message when the predicate returns `false`.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

#[async_trait]
impl Rule for CustomRule {
    async fn check(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome> {
        match self.predicate.test(value, ctx).await {
            Ok(true) => Ok(Outcome::Pass),
            Ok(false) => {
                let message = ctx.message.clone().unwrap_or_else(|| self.message.clone());
                Ok(Outcome::fail("custom", message, value))
            }
            Err(err) => {
                let message = ctx
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("バリデーションエラー: {err}"));
                Ok(Outcome::fail("custom-error", message, value))
            }
        }
    }
}

/// Runs every child against the same value and reports all of their
/// failures together. Passes only if every child passes.
#[derive(Clone, Default)]
pub struct CompositeRule {
    rules: Vec<Arc<dyn Rule>>,
}

impl CompositeRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn add_shared(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for CompositeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeRule")
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[async_trait]
impl Rule for CompositeRule {
    async fn check(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome> {
        let mut errors = Vec::new();
        for rule in &self.rules {
            if let Outcome::Fail(errs) = rule.check(value, ctx).await? {
                errors.extend(errs);
            }
        }
        if errors.is_empty() {
            Ok(Outcome::Pass)
        } else {
            Ok(Outcome::Fail(errors))
        }
    }
}

/// Runs the wrapped rule only when the condition holds.
#[derive(Clone)]
pub struct ConditionalRule {
    condition: Predicate,
    rule: Arc<dyn Rule>,
}

impl ConditionalRule {
    pub fn new<R: Rule + 'static>(condition: Predicate, rule: R) -> Self {
        Self {
            condition,
            rule: Arc::new(rule),
        }
    }

    async fn guarded(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome> {
        if self.condition.test(value, ctx).await? {
            let outcome = self.rule.check(value, ctx).await?;
            if outcome.is_fail() {
                return Ok(outcome);
            }
        }
        Ok(Outcome::Pass)
    }
}

impl fmt::Debug for ConditionalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalRule")
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Rule for ConditionalRule {
    async fn check(&self, value: &Value, ctx: &RuleContext) -> RuleResult<Outcome> {
        match self.guarded(value, ctx).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => Ok(Outcome::fail(
                "conditional-error",
                format!("条件チェックエラー: {err}"),
                value,
            )),
        }
    }
}
