//! Transition dispatcher.
//!
//! # Responsibilities
//! - Compute the match chain for a target path
//! - Diff it against the committed chain
//! - Run exit hooks then entry hooks, one at a time, polling the abort flag
//! - Build the next `RouterState` when the transition survives
//!
//! # Data Flow
//! ```text
//! dispatch(path)
//!     → same as committed path? → Unchanged
//!     → find_matches(path)          (None → empty chain + warn)
//!     → diff(current, next)         → (from, to)
//!     → from.rev(): on_leaving      (deepest first)
//!     → to:         on_entering     (root first)
//!     → aborted? → Aborted  |  else → RouterState
//! ```
//!
//! # Design Decisions
//! - Hooks never run concurrently within one dispatch
//! - The abort flag is checked before every hook, not after
//! - Committing is left to the caller so a facade can decide on policy

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::metrics;
use crate::routing::{find_matches, without_query, Match, RouteError, RouteId, RouteTree};
use crate::state::{RouterState, StateHolder};
use crate::transition::attempt::Transition;
use crate::transition::handler::{BoxError, Instance};

/// Which hook was running when a dispatch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Leaving,
    Entering,
}

impl HookPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            HookPhase::Leaving => "leaving",
            HookPhase::Entering => "entering",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{phase} hook of route \"{route}\" failed: {source}")]
    Hook {
        route: String,
        phase: HookPhase,
        #[source]
        source: BoxError,
    },

    #[error("cannot follow redirect: {0}")]
    Redirect(#[from] RouteError),
}

/// How a failed dispatch is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Hand the error to the router's transition error handler.
    #[default]
    Raise,
    /// Return the error to the caller of `dispatch`.
    Return,
}

/// Result of one dispatch.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Target path equals the committed path; no hooks ran.
    Unchanged,
    Committed(Arc<RouterState>),
    /// A hook aborted the transition. The state was not touched.
    Aborted(Arc<Transition>),
    /// A hook failed and the error went to the error handler.
    Failed,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Unchanged => "unchanged",
            DispatchOutcome::Committed(_) => "committed",
            DispatchOutcome::Aborted(_) => "aborted",
            DispatchOutcome::Failed => "failed",
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, DispatchOutcome::Committed(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, DispatchOutcome::Aborted(_))
    }
}

/// Split two chains into the matches being left and the matches being entered.
///
/// A match present in both chains (same route, same params) appears in neither.
pub fn diff_matches<'a>(
    current: &'a [Match],
    next: &'a [Match],
) -> (Vec<&'a Match>, Vec<&'a Match>) {
    let from = current.iter().filter(|m| !next.contains(m)).collect();
    let to = next.iter().filter(|m| !current.contains(m)).collect();
    (from, to)
}

/// Runs the hook protocol for transitions over one route tree.
pub struct Dispatcher {
    tree: Arc<RouteTree>,
    holder: Arc<StateHolder>,
    instances: DashMap<RouteId, Instance>,
}

impl Dispatcher {
    pub fn new(tree: Arc<RouteTree>, holder: Arc<StateHolder>) -> Self {
        Self {
            tree,
            holder,
            instances: DashMap::new(),
        }
    }

    pub fn tree(&self) -> &Arc<RouteTree> {
        &self.tree
    }

    pub fn holder(&self) -> &Arc<StateHolder> {
        &self.holder
    }

    /// Match chain for `path`; the query part is ignored.
    pub fn match_path(&self, path: &str) -> Option<Vec<Match>> {
        find_matches(without_query(path), self.tree.routes(), None)
    }

    /// Register the rendered instance of a route, replacing any previous one.
    pub fn mount_instance(&self, route: RouteId, instance: Instance) {
        self.instances.insert(route, instance);
    }

    pub fn unmount_instance(&self, route: RouteId) -> Option<Instance> {
        self.instances.remove(&route).map(|(_, instance)| instance)
    }

    pub fn instance(&self, route: RouteId) -> Option<Instance> {
        self.instances.get(&route).map(|entry| Arc::clone(entry.value()))
    }

    /// Run exit and entry hooks for `transition`.
    ///
    /// Returns `Ok(None)` when nothing should be committed: either the path
    /// is already committed or a hook aborted the transition (check
    /// [`Transition::is_aborted`] to tell them apart).
    pub async fn run_transition_hooks(
        &self,
        transition: &Arc<Transition>,
    ) -> Result<Option<RouterState>, DispatchError> {
        let current = self.holder.current();
        if current.as_ref().map(|state| state.path.as_str()) == Some(transition.path()) {
            tracing::debug!(
                transition_id = %transition.id(),
                path = %transition.path(),
                "Path already committed, skipping hooks"
            );
            return Ok(None);
        }

        let next = match self.match_path(transition.path()) {
            Some(chain) => chain,
            None => {
                tracing::warn!(
                    transition_id = %transition.id(),
                    path = %transition.path(),
                    "No route matches path"
                );
                metrics::record_unmatched();
                Vec::new()
            }
        };

        let current_matches: &[Match] = current
            .as_ref()
            .map(|state| state.matches.as_slice())
            .unwrap_or(&[]);
        let (from, to) = diff_matches(current_matches, &next);

        tracing::debug!(
            transition_id = %transition.id(),
            path = %transition.path(),
            leaving = from.len(),
            entering = to.len(),
            "Running transition hooks"
        );

        for leaving in from.iter().rev() {
            if transition.is_aborted() {
                break;
            }
            let Some(hook) = leaving.route.handler().leaving_hook() else {
                continue;
            };
            metrics::record_hook(HookPhase::Leaving);
            let instance = self.instance(leaving.route.id());
            hook(Arc::clone(transition), instance)
                .await
                .map_err(|source| DispatchError::Hook {
                    route: leaving.route.label().to_string(),
                    phase: HookPhase::Leaving,
                    source,
                })?;
        }

        for entering in &to {
            if transition.is_aborted() {
                break;
            }
            let Some(hook) = entering.route.handler().entering_hook() else {
                continue;
            };
            metrics::record_hook(HookPhase::Entering);
            hook(Arc::clone(transition), entering.params.clone())
                .await
                .map_err(|source| DispatchError::Hook {
                    route: entering.route.label().to_string(),
                    phase: HookPhase::Entering,
                    source,
                })?;
        }

        if transition.is_aborted() {
            return Ok(None);
        }

        Ok(Some(RouterState::new(transition.path(), next)))
    }

    /// Run the hooks and commit the result to the state holder.
    ///
    /// Abort handling is left to the caller.
    pub async fn dispatch(&self, path: &str) -> Result<DispatchOutcome, DispatchError> {
        let started = Instant::now();
        let transition = Arc::new(Transition::new(path));

        let outcome = match self.run_transition_hooks(&transition).await {
            Ok(Some(next)) => DispatchOutcome::Committed(self.holder.commit(next)),
            Ok(None) if transition.is_aborted() => DispatchOutcome::Aborted(transition),
            Ok(None) => DispatchOutcome::Unchanged,
            Err(error) => {
                tracing::error!(
                    transition_id = %transition.id(),
                    path = %path,
                    error = %error,
                    "Transition failed"
                );
                metrics::record_dispatch(DispatchOutcome::Failed.as_str(), started);
                return Err(error);
            }
        };

        metrics::record_dispatch(outcome.as_str(), started);
        Ok(outcome)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.tree.len())
            .field("instances", &self.instances.len())
            .field("holder", &self.holder)
            .finish()
    }
}
