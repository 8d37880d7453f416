//! Authorization policies.
//!
//! # Data Flow
//! ```text
//! Policy (fresh per request, from the policy generator)
//!     → engine.rs (precedence: deny list, allow list, default)
//!     → permission.rs (does this rule cover the request?)
//!     → routing (template + parameter constraints)
//!     → Decision::Allow | Decision::Deny
//! ```
//!
//! # Design Decisions
//! - Deny overrides allow by default; explicit denials carve holes in
//!   broad grants
//! - Rules are validated when built, so evaluation cannot fail
//! - Policies are plain values: nothing is cached between requests

pub mod engine;
pub mod permission;

pub use engine::{Decision, DecisionSource, Policy, Precedence, Resolution};
pub use permission::{RoutePermission, RoutePermissionBuilder};
