//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, rule compilation)
//!     → GatewayConfig (validated, immutable)
//!     → policy.rs (PolicyBlueprint behind an ArcSwap)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → blueprint swapped; requests in flight keep the old one
//! ```
//!
//! # Design Decisions
//! - Only the policy section is hot-reloaded; listener and timeouts need a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod policy;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use policy::{BlueprintGenerator, ConstraintConfig, PermissionConfig, PolicyBlueprint, PolicyConfig};
pub use schema::{GatewayConfig, ListenerConfig, ObservabilityConfig, TimeoutConfig};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
