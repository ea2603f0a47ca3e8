//! Route handler capability.
//!
//! A handler is a plain record: an opaque component for the rendering
//! layer plus optional exit and entry hooks. The dispatcher checks which
//! hooks are present; nothing is probed at runtime.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::routing::{extract_query, Params};
use crate::transition::attempt::Transition;

/// Error type returned by hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type HookResult = Result<(), BoxError>;

/// Opaque rendering capability owned by the UI layer.
pub type Component = Arc<dyn Any + Send + Sync>;

/// Rendered instance of a route, mounted by the UI layer.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Boxed future returned by every stored hook.
pub type HookFuture = BoxFuture<'static, HookResult>;

/// Runs before a route stops being active.
pub type LeaveHook = Arc<dyn Fn(Arc<Transition>, Option<Instance>) -> HookFuture + Send + Sync>;

/// Runs before a route becomes active, with the params it resolved.
pub type EnterHook = Arc<dyn Fn(Arc<Transition>, Params) -> HookFuture + Send + Sync>;

#[derive(Clone, Default)]
pub struct Handler {
    component: Option<Component>,
    on_leaving: Option<LeaveHook>,
    on_entering: Option<EnterHook>,
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component<C>(component: C) -> Self
    where
        C: Any + Send + Sync,
    {
        Self {
            component: Some(Arc::new(component)),
            ..Self::default()
        }
    }

    /// Handler whose entry hook redirects to `to`, forwarding the matched
    /// params and the query of the original path.
    pub fn redirect_to(to: impl Into<String>) -> Self {
        let to = to.into();
        Self::new().on_entering(move |transition: Arc<Transition>, params: Params| {
            let to = to.clone();
            async move {
                let query = extract_query(transition.path()).unwrap_or_default();
                transition.redirect(to, params, query);
                HookResult::Ok(())
            }
        })
    }

    pub fn on_leaving<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<Transition>, Option<Instance>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.on_leaving = Some(Arc::new(
            move |transition: Arc<Transition>, instance: Option<Instance>| -> HookFuture {
                Box::pin(hook(transition, instance))
            },
        ));
        self
    }

    pub fn on_entering<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<Transition>, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.on_entering = Some(Arc::new(
            move |transition: Arc<Transition>, params: Params| -> HookFuture {
                Box::pin(hook(transition, params))
            },
        ));
        self
    }

    pub fn component(&self) -> Option<&Component> {
        self.component.as_ref()
    }

    /// Downcast the component to a concrete type.
    pub fn component_as<C: Any>(&self) -> Option<&C> {
        self.component.as_deref().and_then(|c| c.downcast_ref::<C>())
    }

    pub fn leaving_hook(&self) -> Option<&LeaveHook> {
        self.on_leaving.as_ref()
    }

    pub fn entering_hook(&self) -> Option<&EnterHook> {
        self.on_entering.as_ref()
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("component", &self.component.is_some())
            .field("on_leaving", &self.on_leaving.is_some())
            .field("on_entering", &self.on_entering.is_some())
            .finish()
    }
}
