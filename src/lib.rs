//! Nested client-side URL router.
//!
//! A route tree is matched depth-first against a path; the resulting chain
//! is diffed against the active one and asynchronous exit/entry hooks run
//! before the new state is committed. Hooks may abort a transition or
//! redirect it elsewhere.

// Core subsystems
pub mod routing;
pub mod state;
pub mod transition;

// Integration
pub mod location;
pub mod router;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::RouterConfig;
pub use lifecycle::Shutdown;
pub use location::{Location, MemoryLocation};
pub use router::{Navigator, Router, RouterBuilder};
pub use routing::{Params, Query, RouteDescriptor, RouteTree};
pub use state::RouterState;
pub use transition::{DispatchError, DispatchOutcome, ErrorMode, Handler, Transition};
