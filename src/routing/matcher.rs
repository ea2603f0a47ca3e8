//! Route matching logic.
//!
//! # Responsibilities
//! - Find the chain of routes (root → leaf) that matches a path
//! - Carry params resolved at the deepest match up to every ancestor
//! - Fall back to a parent's default route when no sibling matches
//!
//! # Design Decisions
//! - Depth-first: a route's subtree is searched before the route itself
//! - First sibling (or subtree) to match wins; later siblings are skipped
//! - A chain is never empty; "no match" is `None`
//! - Ancestors keep only the params their own pattern declares

use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::routing::tree::RouteNode;
use crate::routing::Params;

/// One route in a match chain with the params it resolved.
#[derive(Debug, Clone)]
pub struct Match {
    pub route: Arc<RouteNode>,
    pub params: Params,
}

impl Match {
    pub fn new(route: Arc<RouteNode>, params: Params) -> Self {
        Self { route, params }
    }
}

/// Same route (by identity) with exactly the same params.
impl PartialEq for Match {
    fn eq(&self, other: &Self) -> bool {
        self.route.id() == other.route.id() && self.params == other.params
    }
}

impl Eq for Match {}

impl Serialize for Match {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Match", 3)?;
        state.serialize_field("route", &self.route.name())?;
        state.serialize_field("path", self.route.path())?;
        state.serialize_field("params", &self.params)?;
        state.end()
    }
}

/// Depth-first search for the first route in `routes` matching `path`.
///
/// `path` must already have its query stripped. Returns the chain ordered
/// from the shallowest to the deepest matched route.
pub fn find_matches(
    path: &str,
    routes: &[Arc<RouteNode>],
    default_route: Option<&Arc<RouteNode>>,
) -> Option<Vec<Match>> {
    let mut chain = find_deepest_first(path, routes, default_route)?;
    chain.reverse();
    Some(chain)
}

// Builds the chain leaf-first so ancestors can be pushed as the recursion unwinds.
fn find_deepest_first(
    path: &str,
    routes: &[Arc<RouteNode>],
    default_route: Option<&Arc<RouteNode>>,
) -> Option<Vec<Match>> {
    for route in routes {
        if let Some(mut chain) = find_deepest_first(path, route.children(), route.default_route()) {
            let params = chain
                .first()
                .map(|deepest| route.own_params(&deepest.params))
                .unwrap_or_default();
            chain.push(Match::new(Arc::clone(route), params));
            return Some(chain);
        }

        if let Some(params) = route.pattern().extract(path) {
            return Some(vec![Match::new(Arc::clone(route), params)]);
        }
    }

    let route = default_route?;
    route
        .pattern()
        .extract(path)
        .map(|params| vec![Match::new(Arc::clone(route), params)])
}

/// The deepest match of a chain, owner of the most specific params.
///
/// Despite the name this is the LAST element, not the tree root.
pub fn root_match(matches: &[Match]) -> Option<&Match> {
    matches.last()
}
