//! Route-level authorization for axum applications.
//!
//! A [`Policy`] is a set of allow and deny [`RoutePermission`]s over path
//! templates, methods and parameter constraints. An [`AuthorizationGateway`]
//! asks a [`PolicyGenerator`] for the policy of each request, evaluates it,
//! and on ALLOW runs the [`TransformationRegistry`] over the handler's
//! arguments before the handler is called.
//!
//! ```text
//!     request ──▶ http::middleware ──▶ gateway ──▶ PolicyGenerator
//!                                        │
//!                                        ├─▶ policy::Policy::evaluate ──▶ DENY: 403
//!                                        │
//!                                        └─▶ transform (ALLOW) ──▶ handler
//! ```

// Core
pub mod error;
pub mod policy;
pub mod routing;
pub mod transform;

// Integration
pub mod gateway;
pub mod http;

// Service
pub mod catalog;
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use error::{AuthorizationError, ConfigurationError, PolicyGenerationError, TransformationError};
pub use gateway::{AuthorizationGateway, PolicyContext, PolicyGenerator, RouteTable, StaticPolicy};
pub use http::{require_authorization_on, AuthorizedRouter, RequestDescriptor};
pub use policy::{Decision, Policy, Precedence, RoutePermission};
pub use routing::{ParameterConstraint, PathTemplate};
pub use transform::{HandlerArgs, RequestTransformation, TransformationRegistry};
