//! Router state subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher resolves a transition
//!     → snapshot.rs (build RouterState from the match chain)
//!     → holder.rs (atomic swap, then notify observers)
//!     → observers (rendering layer, "active state changed" hooks)
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; a commit replaces the whole value
//! - No global store: observers register on the holder they care about
//! - An aborted or failed transition never reaches the holder

pub mod holder;
pub mod snapshot;

pub use holder::{ObserverId, StateHolder, StateObserver};
pub use snapshot::RouterState;
