//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → RouteConfig::to_descriptor + HandlerRegistry
//!     → RouteTree::register
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Handlers are code, so they are bound by route name rather than configured

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    HandlerRegistry, LogFormat, ObservabilityConfig, RouteConfig, RouterConfig, RouterSettings,
};
pub use validation::{validate_config, ValidationError};
