//! Field state store.
//!
//! One [`FieldState`] per field or group id. The store also remembers each
//! id's backing element so required-ness and hidden-area membership can be
//! asked again whenever the document changes.

use crate::element::{ElementRef, declares_required, element_value};
use crate::group::{self, GroupKind};
use crate::hidden::FormView;
use formval_rules::{ValidationError, is_empty};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

#[cfg(test)]
mod tests;

/// Tracked state of one field or group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    pub value: String,
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    /// Set by the first value-changing update; cleared only by reset.
    pub is_dirty: bool,
    /// The user interacted with the field (blur, change).
    pub is_touched: bool,
}

impl Default for FieldState {
    fn default() -> Self {
        Self {
            value: String::new(),
            is_valid: true,
            errors: Vec::new(),
            is_dirty: false,
            is_touched: false,
        }
    }
}

/// Partial state, merged field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateOverrides {
    pub value: Option<String>,
    pub is_valid: Option<bool>,
    pub errors: Option<Vec<ValidationError>>,
    pub is_dirty: Option<bool>,
    pub is_touched: Option<bool>,
}

impl StateOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_valid(mut self, valid: bool) -> Self {
        self.is_valid = Some(valid);
        self
    }

    pub fn with_errors(mut self, errors: Vec<ValidationError>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_dirty(mut self, dirty: bool) -> Self {
        self.is_dirty = Some(dirty);
        self
    }

    pub fn with_touched(mut self, touched: bool) -> Self {
        self.is_touched = Some(touched);
        self
    }

    fn apply(self, state: &mut FieldState) {
        if let Some(value) = self.value {
            state.value = value;
        }
        if let Some(valid) = self.is_valid {
            state.is_valid = valid;
        }
        if let Some(errors) = self.errors {
            state.errors = errors;
        }
        if let Some(dirty) = self.is_dirty {
            state.is_dirty = state.is_dirty || dirty;
        }
        if let Some(touched) = self.is_touched {
            state.is_touched = touched;
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    state: FieldState,
    element: ElementRef,
    group: Option<GroupKind>,
    /// Hidden-area membership at the last evaluation.
    was_hidden: bool,
}

/// Authoritative map of field and group state.
#[derive(Debug, Clone, Default)]
pub struct FieldStateStore {
    entries: BTreeMap<String, Entry>,
}

impl FieldStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id`, computing its initial validity.
    ///
    /// A hidden field starts valid; a field that declares itself required is
    /// valid iff its live value is non-empty; any other field is valid.
    /// `overrides` apply last. Calling this again for the same id replaces
    /// the entry.
    pub fn initialize(
        &mut self,
        id: &str,
        element: ElementRef,
        overrides: Option<StateOverrides>,
        view: &FormView,
    ) {
        let doc = view.doc();
        let hidden = view.is_hidden(element);
        let is_valid = hidden
            || !declares_required(doc, element)
            || !is_empty(&element_value(doc, element));

        let mut state = FieldState {
            value: doc.raw_value(element),
            is_valid,
            ..FieldState::default()
        };
        if let Some(overrides) = overrides {
            overrides.apply(&mut state);
        }
        trace!(target: "formval", id, hidden, valid = state.is_valid, "field initialized");
        self.entries.insert(
            id.to_string(),
            Entry {
                state,
                element,
                group: None,
                was_hidden: hidden,
            },
        );
    }

    /// Merge `overrides` into the state of `id`.
    ///
    /// Unknown ids are ignored, so a late write for a removed field is
    /// harmless. `is_dirty` never goes back to `false` here. Returns whether
    /// the id was known.
    pub fn update(&mut self, id: &str, overrides: StateOverrides) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                overrides.apply(&mut entry.state);
                trace!(target: "formval", id, valid = entry.state.is_valid, "state updated");
                true
            }
            None => {
                trace!(target: "formval", id, "update for unknown id ignored");
                false
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&FieldState> {
        self.entries.get(id).map(|e| &e.state)
    }

    /// Copies of every state, keyed by id.
    pub fn get_all(&self) -> BTreeMap<String, FieldState> {
        self.entries
            .iter()
            .map(|(id, e)| (id.clone(), e.state.clone()))
            .collect()
    }

    /// Backing element of `id`.
    pub fn element(&self, id: &str) -> Option<ElementRef> {
        self.entries.get(id).map(|e| e.element)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Clear value, errors, dirty and touched for every id and force validity.
    ///
    /// Required-ness is not recomputed; call
    /// [`reevaluate_all_required_state`](Self::reevaluate_all_required_state)
    /// if hidden areas may have changed.
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            entry.state = FieldState::default();
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<FieldState> {
        self.entries.remove(id).map(|e| e.state)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Flag `id` as a group of `kind`. Groups always count as required.
    pub fn mark_group(&mut self, id: &str, kind: GroupKind) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.group = Some(kind);
                true
            }
            None => false,
        }
    }

    pub fn is_group(&self, id: &str) -> bool {
        self.entries.get(id).is_some_and(|e| e.group.is_some())
    }

    /// Every id outside a hidden area is valid.
    pub fn is_valid(&self, view: &FormView) -> bool {
        self.entries
            .values()
            .filter(|e| !view.is_hidden(e.element))
            .all(|e| e.state.is_valid)
    }

    /// Any id is dirty. Hidden-area members count too.
    pub fn is_dirty(&self) -> bool {
        self.entries.values().any(|e| e.state.is_dirty)
    }

    fn is_required(entry: &Entry, view: &FormView) -> bool {
        !view.is_hidden(entry.element)
            && (entry.group.is_some() || declares_required(view.doc(), entry.element))
    }

    /// Ids outside hidden areas that declare themselves required, plus every
    /// group outside hidden areas.
    pub fn required_field_ids(&self, view: &FormView) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| Self::is_required(e, view))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn valid_required_count(&self, view: &FormView) -> usize {
        self.entries
            .values()
            .filter(|e| Self::is_required(e, view) && e.state.is_valid)
            .count()
    }

    pub fn total_required_count(&self, view: &FormView) -> usize {
        self.entries
            .values()
            .filter(|e| Self::is_required(e, view))
            .count()
    }

    /// Recompute validity of `id` from its live element, after something
    /// outside the field (typically a hidden area) changed.
    ///
    /// - inside a hidden area: valid, no errors, untouched.
    /// - leaving a hidden area: untouched and errors cleared, then valid
    ///   unless required and empty.
    /// - otherwise: invalid if required and empty; else a stale `required`
    ///   error is dropped and validity follows the remaining errors.
    pub fn reevaluate_required_state(&mut self, id: &str, view: &FormView) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        let doc = view.doc();
        let hidden = view.is_hidden(entry.element);
        let state = &mut entry.state;

        if hidden {
            state.is_valid = true;
            state.errors.clear();
            state.is_touched = false;
        } else {
            let (required, filled) = match entry.group {
                Some(kind) => (
                    group::is_required(doc, entry.element, kind),
                    group::is_satisfied(doc, entry.element, kind),
                ),
                None => (
                    declares_required(doc, entry.element),
                    !is_empty(&element_value(doc, entry.element)),
                ),
            };
            if entry.was_hidden {
                state.errors.clear();
                state.is_touched = false;
            }
            if required && !filled {
                state.is_valid = false;
            } else {
                state.errors.retain(|e| e.rule != "required");
                state.is_valid = state.errors.is_empty();
            }
        }

        trace!(
            target: "formval",
            id,
            hidden,
            was_hidden = entry.was_hidden,
            valid = entry.state.is_valid,
            "required state reevaluated"
        );
        entry.was_hidden = hidden;
        true
    }

    pub fn reevaluate_all_required_state(&mut self, view: &FormView) {
        let ids: Vec<String> = self.entries.keys().cloned().collect();
        for id in ids {
            self.reevaluate_required_state(&id, view);
        }
    }
}
