//! formval-rules
//!
//! Value checks for form fields, composed into ordered chains from a rule list
//! such as `"required,email"`.
//!
//! # Features
//!
//! - **Default rules**: `required`, `email`, `email-conf`, `tel`, `postal-code`,
//!   `number`, `hiragana`, `katakana`, `password`
//! - **Custom rules**: sync or async predicates, composites and conditionals
//! - **Normalization**: full-width digits and dashes folded to ASCII (`replace`)
//! - **Fault isolation**: errors and panics inside a rule surface as a
//!   `validation-error` result, never to the caller
//!
//! # Example
//!
//! ```ignore
//! use formval_rules::{RuleContext, RuleRegistry};
//! use serde_json::json;
//!
//! let registry = RuleRegistry::new();
//! let ctx = RuleContext::new();
//!
//! let result = registry.validate(&json!("user@example.com"), "required,email", &ctx).await;
//! assert!(result.is_valid());
//!
//! let result = registry.validate(&json!(""), "required,email", &ctx).await;
//! assert_eq!(result.first_message(), Some("メールアドレスを入力してください。"));
//! ```

pub mod context;
pub mod error;
pub mod model;
pub mod normalize;
pub mod registry;
pub mod rules;

pub use context::{ElementType, FieldType, LookupFn, RuleConfig, RuleContext, TextMode};
pub use error::{RuleError, RuleResult};
pub use model::{ValidationError, ValidationResult, as_text, is_empty};
pub use registry::{
    Chain, FAULT_TAG, IntoRuleList, MESSAGE_KEY_PREFIX, REPLACE_TOKEN, RuleFactory, RuleRegistry,
    panic_message, parse_rules,
};
pub use rules::{
    CompositeRule, ConditionalRule, CustomRule, EmailConfirmRule, EmailRule, Outcome,
    PostalCodeRule, Predicate, RequiredRule, Rule, TelRule, TextRule, required_message,
};
