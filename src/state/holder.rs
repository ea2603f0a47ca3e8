//! Owner of the current router state.
//!
//! # Responsibilities
//! - Hold the single committed `RouterState`
//! - Replace it atomically on commit
//! - Notify registered observers after every commit
//!
//! # Design Decisions
//! - `ArcSwapOption` for the snapshot: readers never see a partial update
//! - Observers live in a copy-on-write list, so notifying never holds a lock
//! - Observers are called synchronously, in registration order

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};

use crate::state::snapshot::RouterState;

/// Callback invoked with every newly committed state.
pub type StateObserver = Arc<dyn Fn(&Arc<RouterState>) + Send + Sync>;

/// Handle returned by [`StateHolder::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
pub struct StateHolder {
    current: ArcSwapOption<RouterState>,
    observers: ArcSwap<Vec<(ObserverId, StateObserver)>>,
    next_id: AtomicU64,
}

impl StateHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed state, `None` before the first commit.
    pub fn current(&self) -> Option<Arc<RouterState>> {
        self.current.load_full()
    }

    /// Path of the committed state.
    pub fn current_path(&self) -> Option<String> {
        self.current.load().as_ref().map(|state| state.path.clone())
    }

    /// Swap in `next` and notify observers.
    pub fn commit(&self, next: RouterState) -> Arc<RouterState> {
        let state = Arc::new(next);
        self.current.store(Some(Arc::clone(&state)));

        tracing::debug!(
            path = %state.path,
            routes = state.active_routes.len(),
            "Router state committed"
        );

        for (_, observer) in self.observers.load().iter() {
            observer(&state);
        }
        state
    }

    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&Arc<RouterState>) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let observer: StateObserver = Arc::new(observer);
        self.observers.rcu(|observers| {
            let mut updated = Vec::clone(observers);
            updated.push((id, Arc::clone(&observer)));
            updated
        });
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let previous = self.observers.rcu(|observers| {
            observers
                .iter()
                .filter(|(existing, _)| *existing != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|(existing, _)| *existing == id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.load().len()
    }
}

impl fmt::Debug for StateHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHolder")
            .field("current_path", &self.current_path())
            .field("observers", &self.observer_count())
            .finish()
    }
}
