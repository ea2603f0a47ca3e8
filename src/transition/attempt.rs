//! One navigation attempt and its abort/redirect state.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use uuid::Uuid;

use crate::routing::{Params, Query};

/// Where an aborted transition should go instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Route name, or an absolute path pattern.
    pub to: String,
    pub params: Params,
    pub query: Query,
}

impl Redirect {
    pub fn new(to: impl Into<String>, params: Params, query: Query) -> Self {
        Self {
            to: to.into(),
            params,
            query,
        }
    }
}

/// Why a transition was aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    Redirect(Redirect),
    Message(String),
    Unspecified,
}

impl From<Redirect> for AbortReason {
    fn from(redirect: Redirect) -> Self {
        AbortReason::Redirect(redirect)
    }
}

impl From<String> for AbortReason {
    fn from(message: String) -> Self {
        AbortReason::Message(message)
    }
}

impl From<&str> for AbortReason {
    fn from(message: &str) -> Self {
        AbortReason::Message(message.to_string())
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Redirect(redirect) => write!(f, "redirect to \"{}\"", redirect.to),
            AbortReason::Message(message) => f.write_str(message),
            AbortReason::Unspecified => f.write_str("aborted"),
        }
    }
}

/// A single in-flight navigation.
///
/// Hooks receive it behind an `Arc` and may call [`abort`](Self::abort) or
/// [`redirect`](Self::redirect); the dispatcher checks the flag between
/// every hook it runs.
pub struct Transition {
    id: Uuid,
    path: String,
    abort_reason: ArcSwapOption<AbortReason>,
}

impl Transition {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            abort_reason: ArcSwapOption::empty(),
        }
    }

    /// Correlation ID used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Target path, query included.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Stop this transition. A later call replaces the earlier reason.
    pub fn abort(&self, reason: impl Into<AbortReason>) {
        let reason = reason.into();
        tracing::debug!(
            transition_id = %self.id,
            path = %self.path,
            reason = %reason,
            "Transition aborted"
        );
        self.abort_reason.store(Some(Arc::new(reason)));
    }

    /// Abort in favour of another route.
    pub fn redirect(&self, to: impl Into<String>, params: Params, query: Query) {
        self.abort(Redirect::new(to, params, query));
    }

    pub fn is_aborted(&self) -> bool {
        self.abort_reason.load().is_some()
    }

    pub fn abort_reason(&self) -> Option<Arc<AbortReason>> {
        self.abort_reason.load_full()
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("abort_reason", &self.abort_reason())
            .finish()
    }
}
