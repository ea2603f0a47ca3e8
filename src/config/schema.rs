//! Configuration schema definitions.
//!
//! This module defines the configuration structure for a router.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::routing::RouteDescriptor;
use crate::transition::{ErrorMode, Handler};

/// Handlers bound to routes by name when a config is turned into a tree.
pub type HandlerRegistry = HashMap<String, Handler>;

/// Root configuration for a router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Dispatch behaviour.
    pub router: RouterSettings,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Top-level routes in declaration order.
    pub routes: Vec<RouteConfig>,
}

impl RouterConfig {
    /// Route descriptors for the whole table, ready for `RouteTree::register`.
    pub fn descriptors(&self, handlers: &HandlerRegistry) -> Vec<RouteDescriptor> {
        self.routes
            .iter()
            .map(|route| route.to_descriptor(handlers))
            .collect()
    }
}

/// Dispatch settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterSettings {
    /// Hold a lock for the whole of each dispatch.
    pub serialize_dispatches: bool,

    /// How hook failures are surfaced.
    pub error_mode: ErrorMode,

    /// Starting path for locations created from this config.
    pub initial_path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

/// One route and its nested children.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RouteConfig {
    /// Name used for lookups, redirects and handler binding.
    pub name: Option<String>,

    /// Path pattern. Defaults to `/{name}`, else the parent's path.
    pub path: Option<String>,

    /// Render this route when the parent matches but no sibling does.
    #[serde(default)]
    pub default: bool,

    /// Redirect to a route name or absolute path on entry.
    pub redirect_to: Option<String>,

    #[serde(default)]
    pub children: Vec<RouteConfig>,
}

impl RouteConfig {
    /// Convert to a descriptor. A redirect takes precedence over any
    /// handler registered under the route's name.
    pub fn to_descriptor(&self, handlers: &HandlerRegistry) -> RouteDescriptor {
        let mut descriptor = if self.default {
            RouteDescriptor::default_route()
        } else {
            RouteDescriptor::new()
        };

        if let Some(name) = &self.name {
            descriptor = descriptor.name(name.clone());
        }
        if let Some(path) = &self.path {
            descriptor = descriptor.path(path.clone());
        }

        let handler = match &self.redirect_to {
            Some(to) => Handler::redirect_to(to.clone()),
            None => self
                .name
                .as_ref()
                .and_then(|name| handlers.get(name))
                .cloned()
                .unwrap_or_default(),
        };

        descriptor
            .handler(handler)
            .children(self.children.iter().map(|child| child.to_descriptor(handlers)))
    }

    /// Name or path, for messages.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.path.as_deref())
            .unwrap_or("<unnamed>")
    }
}
