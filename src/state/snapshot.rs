//! Immutable router state snapshot.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::routing::{extract_query, root_match, Match, Params, Query, RouteNode};

/// What the router currently considers active.
///
/// Built once per committed transition and never mutated. An empty
/// `matches` means no route matched the path.
#[derive(Debug, Clone)]
pub struct RouterState {
    pub path: String,
    pub matches: Vec<Match>,
    /// Params of the deepest match.
    pub active_params: Params,
    pub active_query: Query,
    pub active_routes: Vec<Arc<RouteNode>>,
}

impl RouterState {
    pub fn new(path: impl Into<String>, matches: Vec<Match>) -> Self {
        let path = path.into();
        let active_params = root_match(&matches)
            .map(|deepest| deepest.params.clone())
            .unwrap_or_default();
        let active_query = extract_query(&path).unwrap_or_default();
        let active_routes = matches.iter().map(|m| Arc::clone(&m.route)).collect();

        Self {
            path,
            matches,
            active_params,
            active_query,
            active_routes,
        }
    }

    /// Whether a route with `name` is part of the active chain.
    pub fn is_active(&self, name: &str) -> bool {
        self.active_routes.iter().any(|route| route.name() == Some(name))
    }

    /// Labels of the active routes, root first.
    pub fn route_labels(&self) -> Vec<&str> {
        self.active_routes.iter().map(|route| route.label()).collect()
    }
}

impl Serialize for RouterState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RouterState", 5)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("matches", &self.matches)?;
        state.serialize_field("active_params", &self.active_params)?;
        state.serialize_field("active_query", &self.active_query)?;
        state.serialize_field("active_routes", &self.route_labels())?;
        state.end()
    }
}
