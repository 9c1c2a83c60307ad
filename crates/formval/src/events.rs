//! Validation and readiness events.
//!
//! Listeners are plain callbacks, called synchronously in registration
//! order. A panicking listener is logged and skipped; the rest still run.

use crate::readiness::Readiness;
use crate::state::FieldState;
use formval_rules::{ValidationError, panic_message};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{trace, warn};

/// Event discriminant, used to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    FieldValidated,
    FormValidated,
    CountUpdated,
    SubmitStateChanged,
    FormReset,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::FieldValidated,
        EventKind::FormValidated,
        EventKind::CountUpdated,
        EventKind::SubmitStateChanged,
        EventKind::FormReset,
    ];

    /// Wire name, e.g. `field:validated`.
    pub fn name(self) -> &'static str {
        match self {
            Self::FieldValidated => "field:validated",
            Self::FormValidated => "form:validated",
            Self::CountUpdated => "count:updated",
            Self::SubmitStateChanged => "submit:state-changed",
            Self::FormReset => "form:reset",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something a form session announces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FormEvent {
    FieldValidated {
        id: String,
        is_valid: bool,
        errors: Vec<ValidationError>,
        value: String,
    },
    FormValidated {
        is_valid: bool,
        states: BTreeMap<String, FieldState>,
    },
    CountUpdated(Readiness),
    SubmitStateChanged {
        can_submit: bool,
    },
    FormReset,
}

impl FormEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::FieldValidated { .. } => EventKind::FieldValidated,
            Self::FormValidated { .. } => EventKind::FormValidated,
            Self::CountUpdated(_) => EventKind::CountUpdated,
            Self::SubmitStateChanged { .. } => EventKind::SubmitStateChanged,
            Self::FormReset => EventKind::FormReset,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&FormEvent) + Send + Sync>;

#[derive(Clone)]
struct Subscription {
    id: ListenerId,
    kind: EventKind,
    listener: Listener,
}

#[derive(Clone, Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&FormEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kind,
            listener: Arc::new(listener),
        });
        id
    }

    /// Remove one listener. Returns whether it was registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.subscriptions.iter().any(|s| s.kind == kind)
    }

    /// Deliver `event` to every listener of its kind.
    pub fn emit(&self, event: &FormEvent) {
        let kind = event.kind();
        trace!(target: "formval", event = %kind, "emit");
        for sub in self.subscriptions.iter().filter(|s| s.kind == kind) {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (sub.listener)(event))) {
                warn!(
                    target: "formval",
                    event = %kind,
                    listener = sub.id.0,
                    panic = %panic_message(payload.as_ref()),
                    "event listener panicked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Listener) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let make = move |tag: &'static str| -> Listener {
            let log = Arc::clone(&log);
            Arc::new(move |e: &FormEvent| log.lock().unwrap().push(format!("{tag}:{}", e.kind())))
        };
        (seen, make)
    }

    #[test]
    fn names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::SubmitStateChanged.to_string(), "submit:state-changed");
        assert_eq!(EventKind::from_name("form:submitted"), None);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let (seen, make) = recorder();
        let mut bus = EventBus::new();
        let a = make("a");
        let b = make("b");
        bus.on(EventKind::FormReset, move |e| a(e));
        bus.on(EventKind::FormReset, move |e| b(e));
        bus.on(EventKind::CountUpdated, |_| panic!("wrong kind"));

        bus.emit(&FormEvent::FormReset);
        assert_eq!(*seen.lock().unwrap(), ["a:form:reset", "b:form:reset"]);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let (seen, make) = recorder();
        let mut bus = EventBus::new();
        bus.on(EventKind::SubmitStateChanged, |_| panic!("listener bug"));
        let after = make("after");
        bus.on(EventKind::SubmitStateChanged, move |e| after(e));

        bus.emit(&FormEvent::SubmitStateChanged { can_submit: true });
        assert_eq!(*seen.lock().unwrap(), ["after:submit:state-changed"]);
    }

    #[test]
    fn off_and_clear() {
        let mut bus = EventBus::new();
        let id = bus.on(EventKind::FormReset, |_| {});
        assert!(bus.has_listeners(EventKind::FormReset));
        assert!(bus.off(id));
        assert!(!bus.off(id));
        assert!(!bus.has_listeners(EventKind::FormReset));

        bus.on(EventKind::CountUpdated, |_| {});
        bus.clear();
        assert!(!bus.has_listeners(EventKind::CountUpdated));
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(FormEvent::SubmitStateChanged { can_submit: false })
            .unwrap();
        assert_eq!(json["type"], "submitStateChanged");
        assert_eq!(json["can_submit"], false);
    }
}
