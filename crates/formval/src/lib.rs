//! # formval
//!
//! Form validation state for host-rendered forms.
//!
//! ## Features
//!
//! - **Field and group state**: value, validity, errors, dirty and touched per id
//! - **Hidden areas**: fields under an excluded subtree are always valid and never required
//! - **Groups**: checkbox, radio and select sets sharing one validity slot
//! - **Readiness**: valid / total required counts and a gated submit decision
//! - **Events**: `field:validated`, `form:validated`, `count:updated`,
//!   `submit:state-changed`, `form:reset`
//! - **Pluggable**: document accessor, hidden-area predicate, presenter and rule registry
//!
//! ## Session
//!
//! ```ignore
//! use formval::{EventKind, FormConfig, FormEvent, FormSession, MemoryDocument, RULE_ATTRIBUTE};
//!
//! let doc = MemoryDocument::new();
//! let mail = doc
//!     .input(doc.root(), "text", "mail")
//!     .attr(RULE_ATTRIBUTE, "required,email")
//!     .build();
//!
//! let session = FormSession::new(doc.clone(), FormConfig::new());
//! session.on(EventKind::CountUpdated, |e| {
//!     if let FormEvent::CountUpdated(r) = e {
//!         println!("{}/{}", r.valid, r.total);
//!     }
//! });
//! session.setup();
//!
//! doc.set_value(mail, "user@example.com");
//! session.blur("mail").await;
//! assert!(session.is_valid());
//! ```

pub mod config;
pub mod debounce;
pub mod element;
pub mod error;
pub mod events;
pub mod group;
pub mod hidden;
pub mod presenter;
pub mod readiness;
pub mod session;
pub mod state;

pub use config::{DEFAULT_HIDDEN_MARKER, ErrorDisplayConfig, FormConfig, ValidationConfig};
pub use debounce::Debouncer;
pub use element::{
    ElementAccessor, ElementBuilder, ElementRef, FIELD_TYPE_ATTRIBUTE, MemoryDocument,
    RULE_ATTRIBUTE,
};
pub use error::{FormError, FormResult};
pub use events::{EventBus, EventKind, FormEvent, Listener, ListenerId};
pub use group::{Group, GroupDisplay, GroupKind, GroupTrigger};
pub use hidden::{FormView, HiddenArea, MarkerWalk};
pub use presenter::{MemoryPresenter, NoopPresenter, Presenter, TracingPresenter};
pub use readiness::Readiness;
pub use session::FormSession;
pub use state::{FieldState, FieldStateStore, StateOverrides};

// Re-export the rule engine for hosts that register their own rules
pub use formval_rules;
pub use formval_rules::{RuleConfig, RuleContext, RuleRegistry, ValidationError, ValidationResult};
