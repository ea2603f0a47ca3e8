//! Location interface.
//!
//! The router does not own browser history. It reads the current path from
//! a `Location`, listens for changes, and asks it to `replace` or `go_back`
//! when a transition is aborted.
//!
//! # Data Flow
//! ```text
//! Location backend ──change(path)──▶ Router::listen ──▶ dispatch(path)
//!        ▲                                                 │
//!        └────── replace(path) / go_back() ◀── abort ──────┘
//! ```

pub mod memory;

use std::fmt;
use std::sync::Arc;

pub use memory::MemoryLocation;

/// Callback fired with the new path whenever the location changes.
pub type ChangeListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Handle returned by [`Location::add_change_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub trait Location: Send + Sync + fmt::Debug {
    /// Current path, query included.
    fn current_path(&self) -> String;

    fn add_change_listener(&self, listener: ChangeListener) -> ListenerId;

    /// Returns false if `id` was not registered.
    fn remove_change_listener(&self, id: ListenerId) -> bool;

    /// Swap the current entry for `path` and notify listeners.
    fn replace(&self, path: &str);

    /// Step back one entry and notify listeners.
    fn go_back(&self);
}
