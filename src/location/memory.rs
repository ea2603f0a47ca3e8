//! In-memory location used by tests and the CLI.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;

use crate::location::{ChangeListener, ListenerId, Location};

#[derive(Debug)]
struct History {
    entries: Vec<String>,
    index: usize,
}

/// A history stack kept in memory.
pub struct MemoryLocation {
    history: Mutex<History>,
    listeners: ArcSwap<Vec<(ListenerId, ChangeListener)>>,
    next_id: AtomicU64,
}

impl MemoryLocation {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(History {
                entries: vec![initial.into()],
                index: 0,
            }),
            listeners: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Push a new entry, dropping anything ahead of the current one.
    pub fn push(&self, path: impl Into<String>) {
        let path = path.into();
        {
            let mut history = self.lock();
            let keep = history.index + 1;
            history.entries.truncate(keep);
            history.entries.push(path.clone());
            history.index = keep;
        }
        self.notify(&path);
    }

    /// Entries up to and including the current one.
    pub fn entries(&self) -> Vec<String> {
        let history = self.lock();
        history.entries[..=history.index].to_vec()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.load().len()
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Called without the history lock so listeners may read the location.
    fn notify(&self, path: &str) {
        for (_, listener) in self.listeners.load().iter() {
            listener(path);
        }
    }
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Location for MemoryLocation {
    fn current_path(&self) -> String {
        let history = self.lock();
        history.entries[history.index].clone()
    }

    fn add_change_listener(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.rcu(|listeners| {
            let mut updated = Vec::clone(listeners);
            updated.push((id, Arc::clone(&listener)));
            updated
        });
        id
    }

    fn remove_change_listener(&self, id: ListenerId) -> bool {
        let previous = self.listeners.rcu(|listeners| {
            listeners
                .iter()
                .filter(|(existing, _)| *existing != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|(existing, _)| *existing == id)
    }

    fn replace(&self, path: &str) {
        {
            let mut history = self.lock();
            let index = history.index;
            history.entries[index] = path.to_string();
        }
        self.notify(path);
    }

    fn go_back(&self) {
        let path = {
            let mut history = self.lock();
            if history.index == 0 {
                tracing::debug!("go_back at first history entry ignored");
                return;
            }
            history.index -= 1;
            history.entries[history.index].clone()
        };
        self.notify(&path);
    }
}

impl fmt::Debug for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLocation")
            .field("history", &*self.lock())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
