//! Authorization gateway subsystem.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor + Extensions (identity) + RouteTable
//!     → generator.rs (external collaborator builds a fresh Policy)
//!     → authorizer.rs (Policy.evaluate)
//!         DENY  → AuthorizationError::Denied, handler never runs
//!         ALLOW → transformations (wrapping mode) → handler
//! ```

pub mod authorizer;
pub mod generator;

pub use authorizer::AuthorizationGateway;
pub use generator::{PolicyContext, PolicyGenerator, RouteEntry, RouteTable, StaticPolicy};
