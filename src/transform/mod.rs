//! Post-authorization request transformations.
//!
//! # Data Flow
//! ```text
//! Decision::Allow
//!     → dispatcher.rs (select transformations registered for the template)
//!     → each transform(request, policy, &mut HandlerArgs), in order
//!     → args.rs (mutated bundle written back into the request)
//!     → downstream handler
//! ```
//!
//! Typical use is narrowing a payload to what the caller may see, using
//! values the policy generator stored in `Policy::metadata`.

pub mod args;
pub mod dispatcher;

pub use args::HandlerArgs;
pub use dispatcher::{RequestTransformation, TransformFn, TransformationRegistry};
