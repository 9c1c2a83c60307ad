//! Error presentation sink.
//!
//! The session decides when a message is shown or cleared; a [`Presenter`]
//! decides how. Rendering, animation and ARIA wiring live in the host.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::Level;

pub trait Presenter: Send + Sync {
    fn show_error(&self, id: &str, message: &str);

    fn clear_error(&self, id: &str);

    fn clear_all(&self);

    /// Called when the gated submit decision changes.
    fn set_submit_enabled(&self, _enabled: bool) {}
}

/// Presenter that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPresenter;

impl Presenter for NoopPresenter {
    fn show_error(&self, _id: &str, _message: &str) {}

    fn clear_error(&self, _id: &str) {}

    fn clear_all(&self) {}
}

/// Presenter that reports every display change as a `tracing` event.
#[derive(Debug, Clone)]
pub struct TracingPresenter {
    /// Tracing event level to emit at.
    pub level: Level,
}

impl Default for TracingPresenter {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

impl TracingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl Presenter for TracingPresenter {
    fn show_error(&self, id: &str, message: &str) {
        emit_at_level!(self.level, target: "formval.display", id, error = message, "show error");
    }

    fn clear_error(&self, id: &str) {
        emit_at_level!(self.level, target: "formval.display", id, "clear error");
    }

    fn clear_all(&self) {
        emit_at_level!(self.level, target: "formval.display", "clear all errors");
    }

    fn set_submit_enabled(&self, enabled: bool) {
        emit_at_level!(self.level, target: "formval.display", enabled, "submit control");
    }
}

#[derive(Debug, Default)]
struct Displayed {
    errors: BTreeMap<String, String>,
    submit_enabled: Option<bool>,
    shown: usize,
}

/// Presenter that records what is currently displayed.
///
/// Clones share the same record, so a test can keep one handle and give the
/// other to the session.
#[derive(Debug, Clone, Default)]
pub struct MemoryPresenter {
    inner: Arc<Mutex<Displayed>>,
}

impl MemoryPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Displayed> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Message currently shown for `id`.
    pub fn error(&self, id: &str) -> Option<String> {
        self.lock().errors.get(id).cloned()
    }

    pub fn errors(&self) -> BTreeMap<String, String> {
        self.lock().errors.clone()
    }

    /// Last submit decision, if one was pushed.
    pub fn submit_enabled(&self) -> Option<bool> {
        self.lock().submit_enabled
    }

    /// Number of `show_error` calls so far.
    pub fn shown_count(&self) -> usize {
        self.lock().shown
    }
}

impl Presenter for MemoryPresenter {
    fn show_error(&self, id: &str, message: &str) {
        let mut d = self.lock();
        d.errors.insert(id.to_string(), message.to_string());
        d.shown += 1;
    }

    fn clear_error(&self, id: &str) {
        self.lock().errors.remove(id);
    }

    fn clear_all(&self) {
        self.lock().errors.clear();
    }

    fn set_submit_enabled(&self, enabled: bool) {
        self.lock().submit_enabled = Some(enabled);
    }
}
