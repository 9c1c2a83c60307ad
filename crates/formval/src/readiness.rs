//! Readiness aggregation: how many required fields are satisfied, and
//! whether the submit control may be enabled.

use crate::hidden::FormView;
use crate::state::FieldStateStore;
use serde::{Deserialize, Serialize};

/// Snapshot of required-field completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Readiness {
    pub valid: usize,
    pub total: usize,
    /// `valid == total`.
    pub is_complete: bool,
    /// Submit decision. Without submit gating this is always `true`.
    pub can_submit: bool,
}

impl Readiness {
    /// Compute readiness from the store. Reads only; calling it twice with
    /// no state change in between yields the same snapshot.
    pub fn compute(store: &FieldStateStore, view: &FormView, gate_submit: bool) -> Self {
        let valid = store.valid_required_count(view);
        let total = store.total_required_count(view);
        let is_complete = valid == total;
        let can_submit = !gate_submit || (is_complete && store.is_valid(view));
        Self {
            valid,
            total,
            is_complete,
            can_submit,
        }
    }

    /// Completion as a whole percentage. An empty form is 100% complete.
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.valid * 100) / self.total).min(100) as u8
    }
}
