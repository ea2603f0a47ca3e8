//! Router facade.
//!
//! # Responsibilities
//! - Own the route tree, dispatcher and state holder
//! - Apply the abort policy (redirect or roll back the location)
//! - Apply the error policy (error handler or returned error)
//! - Follow a `Location` until shutdown
//!
//! # Data Flow
//! ```text
//! Location change ──▶ listen loop ──spawn──▶ dispatch(path)
//!                                               │
//!                     ┌─────────────────────────┼──────────────────────┐
//!                     ▼                         ▼                      ▼
//!               Committed               Aborted(transition)        DispatchError
//!          (observers notified)     on_aborted_transition     on_transition_error
//!                                   (replace / go_back)        or Err(...) to caller
//! ```
//!
//! # Design Decisions
//! - Dispatches may overlap unless `serialize_dispatches` is set
//! - Policies are plain closures with defaults that match browser behaviour
//! - The location is only touched by the abort policy

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::config::{validate_config, ConfigError, HandlerRegistry, RouterConfig};
use crate::lifecycle::ShutdownListener;
use crate::location::{Location, MemoryLocation};
use crate::routing::{Match, Params, Query, RouteError, RouteId, RouteTree};
use crate::state::{ObserverId, RouterState, StateHolder};
use crate::transition::{
    AbortReason, DispatchError, DispatchOutcome, Dispatcher, ErrorMode, Instance, Transition,
};

/// Decides what happens to the location after a transition is aborted.
pub type AbortHandler =
    Arc<dyn Fn(&Transition, &Navigator) -> Result<(), RouteError> + Send + Sync>;

/// Receives dispatch failures in [`ErrorMode::Raise`].
pub type ErrorHandler = Arc<dyn Fn(DispatchError) + Send + Sync>;

/// Builds paths and moves the location.
#[derive(Debug, Clone)]
pub struct Navigator {
    tree: Arc<RouteTree>,
    location: Arc<dyn Location>,
}

impl Navigator {
    pub fn new(tree: Arc<RouteTree>, location: Arc<dyn Location>) -> Self {
        Self { tree, location }
    }

    pub fn location(&self) -> &Arc<dyn Location> {
        &self.location
    }

    /// Path for a route name (or absolute pattern) with params and query.
    pub fn make_path(
        &self,
        to: &str,
        params: &Params,
        query: &Query,
    ) -> Result<String, RouteError> {
        self.tree.make_path(to, params, query)
    }

    /// Replace the current location entry with the path for `to`.
    pub fn replace_with(&self, to: &str, params: &Params, query: &Query) -> Result<(), RouteError> {
        let path = self.make_path(to, params, query)?;
        tracing::debug!(to = %to, path = %path, "Replacing location");
        self.location.replace(&path);
        Ok(())
    }

    pub fn go_back(&self) {
        tracing::debug!("Rolling location back");
        self.location.go_back();
    }
}

/// Redirects replace the current entry; every other abort rolls it back.
pub fn default_aborted_transition_handler(
    transition: &Transition,
    navigator: &Navigator,
) -> Result<(), RouteError> {
    match transition.abort_reason().as_deref() {
        Some(AbortReason::Redirect(redirect)) => {
            navigator.replace_with(&redirect.to, &redirect.params, &redirect.query)
        }
        _ => {
            navigator.go_back();
            Ok(())
        }
    }
}

/// Re-raises the error so a failed hook is never silently dropped.
pub fn default_transition_error_handler(error: DispatchError) {
    panic!("unhandled transition error: {error}");
}

pub struct RouterBuilder {
    tree: RouteTree,
    location: Option<Arc<dyn Location>>,
    observers: Vec<Arc<dyn Fn(&Arc<RouterState>) + Send + Sync>>,
    on_aborted: AbortHandler,
    on_error: ErrorHandler,
    serialize_dispatches: bool,
    error_mode: ErrorMode,
}

impl RouterBuilder {
    fn new(tree: RouteTree) -> Self {
        Self {
            tree,
            location: None,
            observers: Vec::new(),
            on_aborted: Arc::new(default_aborted_transition_handler),
            on_error: Arc::new(default_transition_error_handler),
            serialize_dispatches: false,
            error_mode: ErrorMode::default(),
        }
    }

    /// Location to follow. Defaults to a `MemoryLocation` at `/`.
    pub fn location(mut self, location: Arc<dyn Location>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn on_active_state_change<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Arc<RouterState>) + Send + Sync + 'static,
    {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn on_aborted_transition<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Transition, &Navigator) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.on_aborted = Arc::new(handler);
        self
    }

    pub fn on_transition_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(DispatchError) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(handler);
        self
    }

    /// Run at most one dispatch at a time.
    pub fn serialize_dispatches(mut self, enabled: bool) -> Self {
        self.serialize_dispatches = enabled;
        self
    }

    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    pub fn build(self) -> Router {
        let tree = Arc::new(self.tree);
        let holder = Arc::new(StateHolder::new());
        for observer in self.observers {
            holder.subscribe(move |state| observer(state));
        }

        let location = self
            .location
            .unwrap_or_else(|| Arc::new(MemoryLocation::default()));

        Router {
            navigator: Navigator::new(Arc::clone(&tree), location),
            dispatcher: Dispatcher::new(tree, holder),
            on_aborted: self.on_aborted,
            on_error: self.on_error,
            dispatch_lock: self.serialize_dispatches.then(|| Mutex::new(())),
            error_mode: self.error_mode,
        }
    }
}

/// A route tree bound to a location.
pub struct Router {
    dispatcher: Dispatcher,
    navigator: Navigator,
    on_aborted: AbortHandler,
    on_error: ErrorHandler,
    dispatch_lock: Option<Mutex<()>>,
    error_mode: ErrorMode,
}

impl Router {
    pub fn builder(tree: RouteTree) -> RouterBuilder {
        RouterBuilder::new(tree)
    }

    /// Builder for the router a config describes, with handlers bound by
    /// route name. Observers and policies can still be added before `build`.
    pub fn from_config(
        config: &RouterConfig,
        handlers: &HandlerRegistry,
        location: Arc<dyn Location>,
    ) -> Result<RouterBuilder, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;
        let tree = RouteTree::register(config.descriptors(handlers))?;

        tracing::info!(
            routes = tree.len(),
            serialize_dispatches = config.router.serialize_dispatches,
            error_mode = ?config.router.error_mode,
            "Router configured"
        );

        Ok(Router::builder(tree)
            .location(location)
            .serialize_dispatches(config.router.serialize_dispatches)
            .error_mode(config.router.error_mode))
    }

    pub fn tree(&self) -> &Arc<RouteTree> {
        self.dispatcher.tree()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn location(&self) -> &Arc<dyn Location> {
        self.navigator.location()
    }

    /// The committed state, `None` before the first dispatch.
    pub fn state(&self) -> Option<Arc<RouterState>> {
        self.dispatcher.holder().current()
    }

    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&Arc<RouterState>) + Send + Sync + 'static,
    {
        self.dispatcher.holder().subscribe(observer)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.dispatcher.holder().unsubscribe(id)
    }

    pub fn match_path(&self, path: &str) -> Option<Vec<Match>> {
        self.dispatcher.match_path(path)
    }

    pub fn make_path(
        &self,
        to: &str,
        params: &Params,
        query: &Query,
    ) -> Result<String, RouteError> {
        self.navigator.make_path(to, params, query)
    }

    pub fn mount_instance(&self, route: RouteId, instance: Instance) {
        self.dispatcher.mount_instance(route, instance);
    }

    pub fn unmount_instance(&self, route: RouteId) -> Option<Instance> {
        self.dispatcher.unmount_instance(route)
    }

    /// Commit the state for `path` without running any hooks.
    ///
    /// Used to seed a router whose initial page was produced elsewhere.
    pub fn set_state_from_path(&self, path: &str) -> Arc<RouterState> {
        let matches = self.match_path(path).unwrap_or_default();
        self.dispatcher.holder().commit(RouterState::new(path, matches))
    }

    /// Transition to `path` using the configured error mode.
    ///
    /// This does not move the location; only an abort does.
    pub async fn dispatch(&self, path: &str) -> Result<DispatchOutcome, DispatchError> {
        self.dispatch_with(path, self.error_mode).await
    }

    pub async fn dispatch_with(
        &self,
        path: &str,
        mode: ErrorMode,
    ) -> Result<DispatchOutcome, DispatchError> {
        let _guard = match &self.dispatch_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let result = match self.dispatcher.dispatch(path).await {
            Ok(DispatchOutcome::Aborted(transition)) => {
                tracing::info!(
                    transition_id = %transition.id(),
                    path = %transition.path(),
                    reason = ?transition.abort_reason().as_deref().map(ToString::to_string),
                    "Transition aborted"
                );
                (self.on_aborted)(&transition, &self.navigator)
                    .map(|()| DispatchOutcome::Aborted(transition))
                    .map_err(DispatchError::from)
            }
            other => other,
        };

        match (result, mode) {
            (Ok(outcome), _) => Ok(outcome),
            (Err(error), ErrorMode::Return) => Err(error),
            (Err(error), ErrorMode::Raise) => {
                (self.on_error)(error);
                Ok(DispatchOutcome::Failed)
            }
        }
    }

    /// Dispatch the location's current path.
    pub async fn handle_path_change(&self) -> Result<DispatchOutcome, DispatchError> {
        let path = self.location().current_path();
        self.dispatch(&path).await
    }

    /// Follow the location until `shutdown` fires.
    ///
    /// Dispatches the current path first, then one dispatch per change.
    pub async fn listen(self: Arc<Self>, mut shutdown: ShutdownListener) {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let listener_id = self.location().add_change_listener(Arc::new(move |path: &str| {
            // Receiver gone means the loop already stopped.
            let _ = tx.send(path.to_string());
        }));

        tracing::info!(path = %self.location().current_path(), "Router listening for path changes");
        Arc::clone(&self).spawn_dispatch(self.location().current_path());

        loop {
            tokio::select! {
                Some(path) = rx.recv() => {
                    Arc::clone(&self).spawn_dispatch(path);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Router received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        self.location().remove_change_listener(listener_id);
    }

    fn spawn_dispatch(self: Arc<Self>, path: String) {
        tokio::spawn(async move {
            if let Err(error) = self.dispatch(&path).await {
                tracing::error!(
                    path = %path,
                    error = %error,
                    "Dispatch from location change failed"
                );
            }
        });
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("dispatcher", &self.dispatcher)
            .field("location", self.location())
            .field("serialize_dispatches", &self.dispatch_lock.is_some())
            .field("error_mode", &self.error_mode)
            .finish()
    }
}
