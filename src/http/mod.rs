//! axum integration.
//!
//! # Data Flow
//! ```text
//! axum request (MatchedPath, uri, method, extensions)
//!     → request.rs (RequestDescriptor)
//!     → middleware/ (gateway: generate policy, evaluate, transform)
//!     → response.rs (403 / 400 / 500 on failure)
//!     → handler
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use middleware::AuthorizedPolicy;
pub use request::{QueryParams, RequestDescriptor, RouteTemplate};
pub use router::{require_authorization_on, AuthorizedRouter};
pub use server::GatewayServer;
