//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup):
//!     RouteDescriptor[] (code or config)
//!     → tree.rs (resolve paths, parse patterns, index names)
//!     → Freeze as immutable RouteTree
//!
//! Path Lookup:
//!     "/user/123/tasks/foo?x=1"
//!     → pattern.rs (strip query, split segments)
//!     → matcher.rs (depth-first search over the tree)
//!     → Return: match chain root → leaf, or no match
//! ```
//!
//! # Design Decisions
//! - Routes registered once, immutable afterwards (shared via Arc, no locks)
//! - Deepest match wins; among siblings, first declared wins
//! - Each node only owns the params its own pattern declares
//! - No regex: patterns are matched segment by segment

use std::collections::BTreeMap;

pub mod matcher;
pub mod pattern;
pub mod tree;

/// URL params resolved for one route, keyed by segment name.
pub type Params = BTreeMap<String, String>;

/// Parsed query string.
pub type Query = BTreeMap<String, String>;

pub use matcher::{find_matches, root_match, Match};
pub use pattern::{
    extract_param_names, extract_params, extract_query, inject_params, with_query, without_query,
    PathPattern, PatternError,
};
pub use tree::{RouteDescriptor, RouteError, RouteId, RouteNode, RouteTree, TreeError};
