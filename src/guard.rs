//! Single-flight flags and once-per-session bookkeeping.
//!
//! `FlightFlag` gates an operation so that at most one execution is in
//! flight; concurrent callers are turned away rather than queued. The flag
//! is released by dropping the returned `FlightGuard`, so every exit path
//! (normal return, `?`, early return, panic unwinding) clears it.
//!
//! `AttemptedSet<T>` remembers which keys already had an attempt made
//! during this session.

use crate::error::LockResultExt;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A process-wide "operation in progress" flag.
///
/// Cheaply cloneable; clones share the same flag.
#[derive(Clone, Default)]
pub struct FlightFlag {
    busy: Arc<AtomicBool>,
}

impl std::fmt::Debug for FlightFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightFlag")
            .field("busy", &self.is_set())
            .finish()
    }
}

impl FlightFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start the guarded operation. Returns `None` if it is already running.
    pub fn try_acquire(&self) -> Option<FlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_set(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Holds a [`FlightFlag`] set until dropped.
#[must_use = "dropping the guard immediately releases the flag"]
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// A thread-safe set of keys for which an attempt has already been made.
///
/// # Example
///
/// ```ignore
/// let attempted: AttemptedSet<String> = AttemptedSet::new();
///
/// assert!(attempted.mark(&"goimports".to_string()));
/// assert!(!attempted.mark(&"goimports".to_string())); // already attempted
///
/// attempted.reset(&"goimports".to_string());
/// assert!(attempted.mark(&"goimports".to_string()));
/// ```
#[derive(Clone)]
pub struct AttemptedSet<T> {
    items: Arc<Mutex<HashSet<T>>>,
}

impl<T: Eq + Hash + Clone> AttemptedSet<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Record an attempt. Returns `true` if this is the first attempt for `item`.
    pub fn mark(&self, item: &T) -> bool {
        self.items
            .lock()
            .recover_poison("AttemptedSet::mark")
            .insert(item.clone())
    }

    /// Forget a previous attempt so the next `mark` succeeds again.
    pub fn reset(&self, item: &T) {
        self.items
            .lock()
            .recover_poison("AttemptedSet::reset")
            .remove(item);
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items
            .lock()
            .recover_poison("AttemptedSet::contains")
            .contains(item)
    }
}

impl<T: Eq + Hash + Clone> Default for AttemptedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
