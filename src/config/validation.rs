//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (redirects name existing routes)
//! - Check default-route placement
//! - Check every path pattern parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is turned into a route tree

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{RouteConfig, RouterConfig};
use crate::routing::{PathPattern, PatternError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route name \"{0}\" is used more than once")]
    DuplicateName(String),

    #[error("route at \"{0}\" has an empty name")]
    EmptyName(String),

    #[error("route \"{route}\" redirects to unknown route \"{target}\"")]
    UnknownRedirectTarget { route: String, target: String },

    #[error("route \"{0}\" has more than one default child")]
    MultipleDefaults(String),

    #[error("default route \"{0}\" must be nested inside another route")]
    TopLevelDefault(String),

    #[error("default route \"{0}\" cannot have children")]
    DefaultWithChildren(String),

    #[error("route \"{route}\" has an invalid path: {source}")]
    InvalidPattern {
        route: String,
        #[source]
        source: PatternError,
    },
}

/// Validate the route table, collecting every problem found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for route in &config.routes {
        if route.default {
            errors.push(ValidationError::TopLevelDefault(route.label().to_string()));
        }
    }
    check_routes(&config.routes, &mut names, &mut errors);

    let mut redirects = Vec::new();
    collect_redirects(&config.routes, &mut redirects);
    for (route, target) in redirects {
        // Absolute paths are resolved at redirect time.
        if !target.starts_with('/') && !names.contains(target) {
            errors.push(ValidationError::UnknownRedirectTarget {
                route: route.label().to_string(),
                target: target.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_routes<'a>(
    routes: &'a [RouteConfig],
    names: &mut HashSet<&'a str>,
    errors: &mut Vec<ValidationError>,
) {
    for route in routes {
        if let Some(name) = route.name.as_deref() {
            if name.trim().is_empty() {
                errors.push(ValidationError::EmptyName(
                    route.path.clone().unwrap_or_else(|| "/".to_string()),
                ));
            } else if !names.insert(name) {
                errors.push(ValidationError::DuplicateName(name.to_string()));
            }
        }

        if let Some(path) = &route.path {
            if let Err(source) = PathPattern::parse(path) {
                errors.push(ValidationError::InvalidPattern {
                    route: route.label().to_string(),
                    source,
                });
            }
        }

        if route.default && !route.children.is_empty() {
            errors.push(ValidationError::DefaultWithChildren(route.label().to_string()));
        }

        if route.children.iter().filter(|child| child.default).count() > 1 {
            errors.push(ValidationError::MultipleDefaults(route.label().to_string()));
        }

        check_routes(&route.children, names, errors);
    }
}

fn collect_redirects<'a>(routes: &'a [RouteConfig], out: &mut Vec<(&'a RouteConfig, &'a str)>) {
    for route in routes {
        if let Some(target) = route.redirect_to.as_deref() {
            out.push((route, target));
        }
        collect_redirects(&route.children, out);
    }
}
