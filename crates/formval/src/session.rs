//! Form session: the handle a host drives with field events.
//!
//! A [`FormSession`] owns everything one form needs: the rule registry, the
//! state store, the event bus, the presenter and the document view. Hosts
//! create one per form, call [`setup`](FormSession::setup), and forward
//! input, blur, focus and group change events to it.
//!
//! All methods take `&self`. Internal locks are never held across an await,
//! so chain evaluations for different fields may interleave; the store is
//! keyed by field id and the last completed write wins.

use crate::config::FormConfig;
use crate::debounce::Debouncer;
use crate::element::{
    ElementAccessor, ElementRef, declares_required, element_value, field_id, rules_for,
};
use crate::events::{EventBus, EventKind, FormEvent, ListenerId};
use crate::group::{self, Group, GroupDisplay, GroupTrigger};
use crate::hidden::{FormView, HiddenArea, MarkerWalk};
use crate::presenter::{NoopPresenter, Presenter};
use crate::readiness::Readiness;
use crate::state::{FieldState, FieldStateStore, StateOverrides};
use formval_rules::{RuleContext, RuleRegistry, ValidationResult};
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};


#[derive(Debug, Default)]
struct Inner {
    store: FieldStateStore,
    groups: Vec<Group>,
    /// Last submit decision pushed to the presenter.
    submit: Option<bool>,
}

/// Presenter calls collected under the store lock, dispatched after it is
/// released.
type Displays = Vec<(String, GroupDisplay)>;

/// Result of one chain run, not yet written to the store.
enum FieldRun {
    Hidden {
        id: String,
        value: String,
    },
    Checked {
        id: String,
        value: String,
        result: ValidationResult,
    },
}

pub struct FormSession {
    view: FormView,
    config: FormConfig,
    registry: RuleRegistry,
    presenter: Arc<dyn Presenter>,
    debouncer: Debouncer,
    base: RuleContext,
    inner: Mutex<Inner>,
    events: Mutex<EventBus>,
}

impl fmt::Debug for FormSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSession")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}

impl FormSession {
    /// Create a session over `doc`. Nothing is discovered until
    /// [`setup`](Self::setup).
    pub fn new<D>(doc: D, config: FormConfig) -> Self
    where
        D: ElementAccessor + 'static,
    {
        let doc: Arc<dyn ElementAccessor> = Arc::new(doc);
        let view = FormView::new(doc, Arc::new(MarkerWalk::new(config.hidden_marker.clone())));
        let base = RuleContext::new()
            .with_custom_messages(config.custom_messages.clone())
            .with_rule_options(config.rules.clone());
        Self {
            view,
            config,
            registry: RuleRegistry::new(),
            presenter: Arc::new(NoopPresenter),
            debouncer: Debouncer::new(),
            base,
            inner: Mutex::new(Inner::default()),
            events: Mutex::new(EventBus::new()),
        }
    }

    pub fn with_presenter<P: Presenter + 'static>(mut self, presenter: P) -> Self {
        self.presenter = Arc::new(presenter);
        self
    }

    /// Replace the default marker walk.
    pub fn with_hidden_area<H: HiddenArea + 'static>(mut self, hidden: H) -> Self {
        self.view = FormView::new(self.view.shared_doc(), Arc::new(hidden));
        self
    }

    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Callback for tel / postal-code checks that enable `external_lookup`
    /// in their rule block.
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.base.lookup = Some(Arc::new(lookup));
        self
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bus(&self) -> MutexGuard<'_, EventBus> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn doc(&self) -> &dyn ElementAccessor {
        self.view.doc()
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn view(&self) -> &FormView {
        &self.view
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    // -- events ---------------------------------------------------------

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&FormEvent) + Send + Sync + 'static,
    {
        self.bus().on(kind, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.bus().off(id)
    }

    /// Listeners run on a snapshot of the bus, so they may subscribe or
    /// unsubscribe without deadlocking.
    fn emit(&self, event: FormEvent) {
        let bus = self.bus().clone();
        bus.emit(&event);
    }

    // -- lifecycle ------------------------------------------------------

    /// Discover fields and groups and compute their initial state.
    ///
    /// Fields without a name or id are skipped. Groups get a programmatic
    /// validation pass, then readiness is reported once.
    pub fn setup(&self) {
        let doc = self.doc();
        let mut displays = Displays::new();
        {
            let mut guard = self.inner();
            let inner = &mut *guard;
            inner.store.clear();
            inner.submit = None;

            for el in doc.fields() {
                match field_id(doc, el) {
                    Some(id) => inner.store.initialize(&id, el, None, &self.view),
                    None => {
                        debug!(target: "formval", element = el.0, "field without name or id skipped")
                    }
                }
            }

            inner.groups = group::discover(doc);
            for g in &inner.groups {
                inner.store.initialize(&g.id, g.container, None, &self.view);
                inner.store.mark_group(&g.id, g.kind);
                let display = group::validate_group(
                    &mut inner.store,
                    &self.view,
                    g,
                    GroupTrigger::Programmatic,
                    &self.base,
                );
                displays.push((g.id.clone(), display));
            }
            debug!(
                target: "formval",
                fields = inner.store.len(),
                groups = inner.groups.len(),
                "form setup"
            );
        }
        self.show(displays);
        self.recount();
    }

    /// Stop everything: pending input waits are cancelled, listeners are
    /// dropped and the store is cleared. Chain runs still in flight finish,
    /// but their writes find no id and are ignored.
    pub fn teardown(&self) {
        self.debouncer.cancel_all();
        self.bus().clear();
        let mut inner = self.inner();
        inner.store.clear();
        inner.groups.clear();
        inner.submit = None;
        debug!(target: "formval", "form torn down");
    }

    /// Reset every state, clear every displayed error, report readiness and
    /// announce the reset.
    pub fn reset(&self) {
        self.debouncer.cancel_all();
        self.inner().store.reset();
        self.presenter.clear_all();
        self.recount();
        self.emit(FormEvent::FormReset);
    }

    // -- field events ---------------------------------------------------

    /// Input event. With input validation enabled, waits out the debounce
    /// delay and validates unless a newer input for the same field arrived.
    /// Returns whether a validation ran.
    pub async fn input(&self, id: &str) -> bool {
        if !self.config.validation.validate_on_input {
            return false;
        }
        if !self.debouncer.settle(id, self.config.debounce_delay()).await {
            return false;
        }
        self.validate_field(id).await
    }

    /// Blur event: marks the field touched and, with blur validation
    /// enabled, validates it.
    ///
    /// A group id is not a field: only a member change or forced
    /// validation touches a group.
    pub async fn blur(&self, id: &str) -> bool {
        {
            let mut inner = self.inner();
            if inner.store.is_group(id)
                || !inner.store.update(id, StateOverrides::new().with_touched(true))
            {
                return false;
            }
        }
        if !self.config.validation.validate_on_blur {
            return false;
        }
        self.validate_field(id).await
    }

    /// Focus event: clears the displayed error when configured to.
    pub fn focus(&self, id: &str) {
        if self.config.error_display.clear_on_focus {
            self.presenter.clear_error(id);
        }
    }

    /// Change event on a group member. Returns whether `id` is a group.
    pub fn change_group(&self, id: &str) -> bool {
        let display = {
            let mut guard = self.inner();
            let inner = &mut *guard;
            let Some(g) = inner.groups.iter().find(|g| g.id == id) else {
                return false;
            };
            group::validate_group(
                &mut inner.store,
                &self.view,
                g,
                GroupTrigger::User,
                &self.base,
            )
        };
        self.show(vec![(id.to_string(), display)]);
        self.recount();
        true
    }

    // -- validation -----------------------------------------------------

    fn field_context(&self, el: ElementRef) -> RuleContext {
        let doc = self.doc();
        let mut ctx = self.base.clone();
        ctx.element_type = Some(doc.kind(el));
        ctx.field_type = doc.field_type(el);
        ctx.fallback_email = self.email_source().map(|e| doc.raw_value(e));
        ctx
    }

    /// First field checked as an email address that is not itself a
    /// confirmation field.
    fn email_source(&self) -> Option<ElementRef> {
        let doc = self.doc();
        doc.fields().into_iter().find(|&el| {
            let rules = rules_for(doc, el);
            rules.iter().any(|r| r == "email") && !rules.iter().any(|r| r == "email-conf")
        })
    }

    /// Run the chain for `id` without touching the store. Groups have no
    /// chain; they go through [`change_group`](Self::change_group).
    async fn run_field(&self, id: &str) -> Option<FieldRun> {
        let el = {
            let inner = self.inner();
            if inner.store.is_group(id) {
                return None;
            }
            inner.store.element(id)?
        };
        let doc = self.doc();
        let value = doc.raw_value(el);
        if self.view.is_hidden(el) {
            return Some(FieldRun::Hidden {
                id: id.to_string(),
                value,
            });
        }

        let rules = rules_for(doc, el);
        let ctx = self.field_context(el);
        let result = self
            .registry
            .validate(&element_value(doc, el), rules, &ctx)
            .await;
        trace!(target: "formval", id, valid = result.is_valid(), "chain finished");
        Some(FieldRun::Checked {
            id: id.to_string(),
            value,
            result,
        })
    }

    /// Write one run to the store and queue its display. Returns the event
    /// to announce, if any.
    fn apply(
        &self,
        store: &mut FieldStateStore,
        run: FieldRun,
        displays: &mut Displays,
    ) -> Option<FormEvent> {
        match run {
            FieldRun::Hidden { id, value } => {
                let changed = store.get(&id).is_some_and(|s| s.value != value);
                let overrides = StateOverrides::new()
                    .with_value(value)
                    .with_valid(true)
                    .with_errors(Vec::new())
                    .with_dirty(changed);
                if store.update(&id, overrides) {
                    displays.push((id, GroupDisplay::Clear));
                }
                None
            }
            FieldRun::Checked { id, value, result } => {
                let changed = store.get(&id).is_some_and(|s| s.value != value);
                let is_valid = result.is_valid();
                let errors = result.into_errors();
                let overrides = StateOverrides::new()
                    .with_value(value.clone())
                    .with_valid(is_valid)
                    .with_errors(errors.clone())
                    .with_dirty(changed);
                if !store.update(&id, overrides) {
                    return None;
                }
                if self.config.error_display.show_on_validation {
                    let display = match errors.first() {
                        Some(e) => GroupDisplay::Show(e.message.clone()),
                        None => GroupDisplay::Clear,
                    };
                    displays.push((id.clone(), display));
                }
                Some(FormEvent::FieldValidated {
                    id,
                    is_valid,
                    errors,
                    value,
                })
            }
        }
    }

    /// Validate one field and report readiness.
    ///
    /// A field inside a hidden area is written valid without running its
    /// chain. Returns `false` if `id` is unknown or vanished before the
    /// result could be written.
    pub async fn validate_field(&self, id: &str) -> bool {
        let Some(run) = self.run_field(id).await else {
            return false;
        };
        let mut displays = Displays::new();
        let event = {
            let mut inner = self.inner();
            if !inner.store.contains(id) {
                return false;
            }
            self.apply(&mut inner.store, run, &mut displays)
        };
        self.show(displays);
        if let Some(event) = event {
            self.emit(event);
        }
        self.recount();
        true
    }

    fn field_ids(&self, filter: impl Fn(&FieldStateStore, &str) -> bool) -> Vec<String> {
        let inner = self.inner();
        inner
            .store
            .ids()
            .filter(|id| !inner.store.is_group(id) && filter(&inner.store, id))
            .map(str::to_string)
            .collect()
    }

    /// Validate every field, then force-validate every group.
    ///
    /// Returns the aggregate validity.
    pub async fn validate_all(&self) -> bool {
        let ids = self.field_ids(|_, _| true);
        self.validate_batch(ids).await
    }

    /// Like [`validate_all`](Self::validate_all) but only for fields that are
    /// required or already hold a value.
    pub async fn check(&self) -> bool {
        let doc = self.doc();
        let ids = self.field_ids(|store, id| {
            store.element(id).is_some_and(|el| {
                declares_required(doc, el) || !doc.raw_value(el).trim().is_empty()
            })
        });
        self.validate_batch(ids).await
    }

    /// Run all chains as one batch, then write the results, force every
    /// group, and report readiness exactly once.
    async fn validate_batch(&self, ids: Vec<String>) -> bool {
        let runs = join_all(ids.iter().map(|id| self.run_field(id))).await;

        let mut displays = Displays::new();
        let events: Vec<FormEvent> = {
            let mut guard = self.inner();
            let inner = &mut *guard;
            let events = runs
                .into_iter()
                .flatten()
                .filter_map(|run| self.apply(&mut inner.store, run, &mut displays))
                .collect();
            for g in &inner.groups {
                let display = group::validate_group(
                    &mut inner.store,
                    &self.view,
                    g,
                    GroupTrigger::Forced,
                    &self.base,
                );
                displays.push((g.id.clone(), display));
            }
            events
        };
        self.show(displays);
        for event in events {
            self.emit(event);
        }
        self.recount();

        let (is_valid, states) = {
            let inner = self.inner();
            (inner.store.is_valid(&self.view), inner.store.get_all())
        };
        debug!(target: "formval", fields = ids.len(), is_valid, "form validated");
        self.emit(FormEvent::FormValidated { is_valid, states });
        is_valid
    }

    /// Re-check after hidden areas changed: reevaluate required state,
    /// clear errors that no longer apply, re-evaluate groups keeping their
    /// touched flag, and report readiness.
    pub fn update(&self) {
        let displays: Displays = {
            let mut guard = self.inner();
            let inner = &mut *guard;
            inner.store.reevaluate_all_required_state(&self.view);

            let mut displays: Displays = inner
                .store
                .ids()
                .filter(|id| {
                    !inner.store.is_group(id)
                        && inner.store.get(id).is_some_and(|s| s.errors.is_empty())
                })
                .map(|id| (id.to_string(), GroupDisplay::Clear))
                .collect();

            for g in &inner.groups {
                let display = group::validate_group(
                    &mut inner.store,
                    &self.view,
                    g,
                    GroupTrigger::Programmatic,
                    &self.base,
                );
                displays.push((g.id.clone(), display));
            }
            displays
        };
        self.show(displays);
        self.recount();
    }

    /// Submit attempt. An invalid form is fully validated so every error
    /// surfaces, and the submit is refused.
    pub async fn submit(&self) -> bool {
        if self.is_valid() {
            return true;
        }
        debug!(target: "formval", "submit refused, validating all fields");
        self.validate_all().await;
        false
    }

    /// Must run with the store lock released.
    fn show(&self, displays: Displays) {
        for (id, display) in displays {
            match display {
                GroupDisplay::Show(message) => self.presenter.show_error(&id, &message),
                GroupDisplay::Clear => self.presenter.clear_error(&id),
            }
        }
    }

    /// Recompute readiness, announce it, and push the submit decision when
    /// gating is on and the decision changed.
    fn recount(&self) {
        let gate = self.config.disable_submit_until_valid;
        let (readiness, changed) = {
            let mut inner = self.inner();
            let readiness = Readiness::compute(&inner.store, &self.view, gate);
            let changed = gate && inner.submit != Some(readiness.can_submit);
            if changed {
                inner.submit = Some(readiness.can_submit);
            }
            (readiness, changed)
        };
        trace!(
            target: "formval",
            valid = readiness.valid,
            total = readiness.total,
            can_submit = readiness.can_submit,
            "readiness"
        );

        self.emit(FormEvent::CountUpdated(readiness));
        if changed {
            self.presenter.set_submit_enabled(readiness.can_submit);
            self.emit(FormEvent::SubmitStateChanged {
                can_submit: readiness.can_submit,
            });
        }
    }

    // -- queries --------------------------------------------------------

    pub fn state(&self, id: &str) -> Option<FieldState> {
        self.inner().store.get(id).cloned()
    }

    pub fn states(&self) -> BTreeMap<String, FieldState> {
        self.inner().store.get_all()
    }

    pub fn groups(&self) -> Vec<Group> {
        self.inner().groups.clone()
    }

    pub fn is_valid(&self) -> bool {
        self.inner().store.is_valid(&self.view)
    }

    pub fn is_dirty(&self) -> bool {
        self.inner().store.is_dirty()
    }

    pub fn readiness(&self) -> Readiness {
        let inner = self.inner();
        Readiness::compute(&inner.store, &self.view, self.config.disable_submit_until_valid)
    }
}
