//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every ShutdownListener wakes → Router::listen exits
//!                                              → change listener removed
//! ```
//!
//! # Design Decisions
//! - In-flight dispatches are not cancelled; only the loop stops
//! - A listener subscribed after the trigger still observes it

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownListener};
