//! Transition subsystem.
//!
//! # Data Flow
//! ```text
//! Router::dispatch(path)
//!     → attempt.rs    (Transition: id, target path, abort flag)
//!     → dispatcher.rs (diff chains, run hooks from handler.rs)
//!     → RouterState | abort | DispatchError
//! ```
//!
//! # Design Decisions
//! - Hooks are async and run strictly one after another
//! - Aborting is cooperative: hooks set a flag, the dispatcher polls it
//! - A redirect is just an abort carrying a target

pub mod attempt;
pub mod dispatcher;
pub mod handler;

pub use attempt::{AbortReason, Redirect, Transition};
pub use dispatcher::{
    diff_matches, DispatchError, DispatchOutcome, Dispatcher, ErrorMode, HookPhase,
};
pub use handler::{
    BoxError, Component, EnterHook, Handler, HookFuture, HookResult, Instance, LeaveHook,
};
