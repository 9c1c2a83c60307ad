//! Per-key input coalescing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Default)]
struct Pending {
    /// Generation of the newest wait per key.
    waits: HashMap<String, u64>,
    next: u64,
}

/// Coalesces bursts of events per key.
///
/// [`settle`](Self::settle) waits out the delay and reports whether the
/// caller is still the newest waiter for its key. Only waits are
/// superseded or cancelled; work started after a successful settle is never
/// interrupted. Clones share the same pending set.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    pending: Arc<Mutex<Pending>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait `delay`, then return `true` unless a newer `settle` for `key`
    /// started or the key was cancelled meanwhile.
    pub async fn settle(&self, key: &str, delay: Duration) -> bool {
        let generation = {
            let mut p = self.lock();
            p.next += 1;
            let generation = p.next;
            p.waits.insert(key.to_string(), generation);
            generation
        };

        tokio::time::sleep(delay).await;

        let mut p = self.lock();
        if p.waits.get(key) == Some(&generation) {
            p.waits.remove(key);
            true
        } else {
            trace!(target: "formval", key, "debounced wait superseded");
            false
        }
    }

    /// Drop the pending wait for `key`. Returns whether one existed.
    pub fn cancel(&self, key: &str) -> bool {
        self.lock().waits.remove(key).is_some()
    }

    pub fn cancel_all(&self) {
        self.lock().waits.clear();
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().waits.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().waits.len()
    }
}
