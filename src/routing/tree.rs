//! Route tree construction and name lookup.
//!
//! # Responsibilities
//! - Turn nested route descriptors into immutable route nodes
//! - Resolve each node's path and param names from its own pattern
//! - Index named routes for redirects and URL building
//! - Reject structurally broken route tables
//!
//! # Design Decisions
//! - Nodes are built depth-first and frozen behind `Arc`
//! - Node identity is a `RouteId` assigned in registration order
//! - A route without a path takes `/{name}`, else its parent's path, else `/`
//! - A nested pattern must declare every param its parent declares

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::routing::pattern::{
    extract_query, with_query, without_query, PathPattern, PatternError,
};
use crate::routing::{Params, Query};
use crate::transition::Handler;

/// Errors raised while registering routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("you cannot use the name \"{name}\" for more than one route")]
    DuplicateRouteName { name: String },

    #[error("route \"{parent}\" has more than one default route")]
    DuplicateDefaultRoute { parent: String },

    #[error("default route \"{route}\" must be nested inside another route")]
    OrphanDefaultRoute { route: String },

    #[error("default route \"{route}\" cannot have children")]
    DefaultRouteWithChildren { route: String },

    #[error(
        "nested route path \"{path}\" is missing the \"{param}\" param of its parent path \"{parent}\""
    )]
    MissingParentParam {
        path: String,
        param: String,
        parent: String,
    },

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Errors raised while building a path from a route name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("unable to find a route named \"{name}\"")]
    UnknownRoute { name: String },

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Stable identity of a node within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(usize);

impl RouteId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Declarative description of a route, consumed once by [`RouteTree::register`].
#[derive(Debug, Clone, Default)]
pub struct RouteDescriptor {
    name: Option<String>,
    path: Option<String>,
    handler: Handler,
    children: Vec<RouteDescriptor>,
    is_default: bool,
}

impl RouteDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A route reachable by name, with its path defaulting to `/{name}`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().name(name)
    }

    /// The route rendered when its parent matches but no sibling does.
    pub fn default_route() -> Self {
        Self {
            is_default: true,
            ..Self::default()
        }
    }

    /// A route that redirects to `to` (a route name or absolute path),
    /// carrying over the matched params and the query.
    pub fn redirect(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new().path(from).handler(Handler::redirect_to(to))
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = handler;
        self
    }

    pub fn child(mut self, child: RouteDescriptor) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = RouteDescriptor>) -> Self {
        self.children.extend(children);
        self
    }

    fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.path.clone())
            .unwrap_or_else(|| "<unnamed>".to_string())
    }
}

/// A registered route. Immutable once the tree is built.
pub struct RouteNode {
    id: RouteId,
    name: Option<String>,
    pattern: PathPattern,
    param_names: Vec<String>,
    children: Vec<Arc<RouteNode>>,
    default_route: Option<Arc<RouteNode>>,
    is_default: bool,
    handler: Handler,
}

impl RouteNode {
    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }

    /// Names declared by this node's own pattern.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn children(&self) -> &[Arc<RouteNode>] {
        &self.children
    }

    pub fn default_route(&self) -> Option<&Arc<RouteNode>> {
        self.default_route.as_ref()
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Name if the route has one, path otherwise. Used in logs and errors.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.pattern.as_str())
    }

    /// Pick this node's own params out of a wider params map.
    pub fn own_params(&self, params: &Params) -> Params {
        self.param_names
            .iter()
            .filter_map(|name| params.get(name).map(|value| (name.clone(), value.clone())))
            .collect()
    }
}

impl fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("path", &self.pattern.as_str())
            .field("param_names", &self.param_names)
            .field("children", &self.children.len())
            .field("has_default_route", &self.default_route.is_some())
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// The registered route hierarchy plus its name index.
#[derive(Debug)]
pub struct RouteTree {
    routes: Vec<Arc<RouteNode>>,
    named: HashMap<String, Arc<RouteNode>>,
    len: usize,
}

impl RouteTree {
    /// Build the tree from top-level descriptors.
    pub fn register(descriptors: Vec<RouteDescriptor>) -> Result<Self, TreeError> {
        let mut registrar = Registrar::default();
        let (routes, _) = registrar.register_children(descriptors, None)?;

        tracing::debug!(
            routes = registrar.next_id,
            named = registrar.named.len(),
            "Route tree registered"
        );

        Ok(Self {
            routes,
            named: registrar.named,
            len: registrar.next_id,
        })
    }

    /// Top-level routes in declaration order.
    pub fn routes(&self) -> &[Arc<RouteNode>] {
        &self.routes
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&Arc<RouteNode>> {
        self.named.get(name)
    }

    /// Total number of registered nodes, default routes included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Build a path to `to`, which is either a route name or an absolute
    /// path pattern, appending `query` when it is non-empty.
    ///
    /// A query written into an absolute `to` is kept; keys in `query` win.
    pub fn make_path(
        &self,
        to: &str,
        params: &Params,
        query: &Query,
    ) -> Result<String, RouteError> {
        if to.starts_with('/') {
            let path = PathPattern::parse(without_query(to))?.inject(params)?;
            let mut merged = extract_query(to).unwrap_or_default();
            merged.extend(query.iter().map(|(k, v)| (k.clone(), v.clone())));
            return Ok(with_query(&path, &merged));
        }

        let path = self
            .lookup_by_name(to)
            .ok_or_else(|| RouteError::UnknownRoute {
                name: to.to_string(),
            })?
            .pattern()
            .inject(params)?;
        Ok(with_query(&path, query))
    }
}

struct ParentContext<'a> {
    label: String,
    path: &'a str,
    param_names: &'a [String],
}

#[derive(Default)]
struct Registrar {
    next_id: usize,
    named: HashMap<String, Arc<RouteNode>>,
}

impl Registrar {
    fn register_children(
        &mut self,
        descriptors: Vec<RouteDescriptor>,
        parent: Option<&ParentContext<'_>>,
    ) -> Result<(Vec<Arc<RouteNode>>, Option<Arc<RouteNode>>), TreeError> {
        let mut routes = Vec::with_capacity(descriptors.len());
        let mut default_route = None;

        for descriptor in descriptors {
            if !descriptor.is_default {
                routes.push(self.register_route(descriptor, parent)?);
                continue;
            }

            let Some(parent_ctx) = parent else {
                return Err(TreeError::OrphanDefaultRoute {
                    route: descriptor.label(),
                });
            };
            if default_route.is_some() {
                return Err(TreeError::DuplicateDefaultRoute {
                    parent: parent_ctx.label.clone(),
                });
            }
            if !descriptor.children.is_empty() {
                return Err(TreeError::DefaultRouteWithChildren {
                    route: descriptor.label(),
                });
            }
            default_route = Some(self.register_route(descriptor, parent)?);
        }

        Ok((routes, default_route))
    }

    fn register_route(
        &mut self,
        descriptor: RouteDescriptor,
        parent: Option<&ParentContext<'_>>,
    ) -> Result<Arc<RouteNode>, TreeError> {
        let id = RouteId(self.next_id);
        self.next_id += 1;

        let path = resolve_path(&descriptor, parent);
        let pattern = PathPattern::parse(&path)?;
        let param_names = pattern.param_names();

        if let Some(parent) = parent {
            if let Some(missing) = parent
                .param_names
                .iter()
                .find(|name| !param_names.contains(name))
            {
                return Err(TreeError::MissingParentParam {
                    path,
                    param: missing.clone(),
                    parent: parent.path.to_string(),
                });
            }
        }

        if let Some(name) = &descriptor.name {
            if self.named.contains_key(name) {
                return Err(TreeError::DuplicateRouteName { name: name.clone() });
            }
        }

        let label = descriptor.label();
        let context = ParentContext {
            label,
            path: &path,
            param_names: &param_names,
        };
        let (children, default_route) =
            self.register_children(descriptor.children, Some(&context))?;

        let node = Arc::new(RouteNode {
            id,
            name: descriptor.name,
            pattern,
            param_names,
            children,
            default_route,
            is_default: descriptor.is_default,
            handler: descriptor.handler,
        });

        if let Some(name) = &node.name {
            // A descendant may have claimed the name while the children were registered.
            if self.named.insert(name.clone(), Arc::clone(&node)).is_some() {
                return Err(TreeError::DuplicateRouteName { name: name.clone() });
            }
        }

        Ok(node)
    }
}

fn resolve_path(descriptor: &RouteDescriptor, parent: Option<&ParentContext<'_>>) -> String {
    match (&descriptor.path, &descriptor.name) {
        (Some(path), _) => normalize_path(path),
        (None, Some(name)) if !descriptor.is_default => format!("/{name}"),
        _ => parent.map_or_else(|| "/".to_string(), |p| p.path.to_string()),
    }
}

fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}
