//! Route and parameter matching.
//!
//! # Data Flow
//! ```text
//! RoutePermission.matches(request)
//!     → template.rs (path template membership, or raw-path matching)
//!     → constraint.rs (path and query parameter constraints)
//!     → bool
//! ```
//!
//! # Design Decisions
//! - Templates and constraints are validated when built, never per request
//! - Matching is pure: no allocation beyond bound parameters, no shared state
//! - No percent-decoding; the host framework supplies decoded values

pub mod constraint;
pub mod template;

pub use constraint::{satisfies, satisfies_any, CompareOp, ParameterConstraint, Pattern};
pub use template::{decode_path_params, match_path, PathParams, PathTemplate};
