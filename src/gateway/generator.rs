//! Policy generation seam.
//!
//! # Responsibilities
//! - Define what the external policy collaborator receives and returns
//! - Enumerate the host's routes so generators can build "all routes" rules
//!
//! # Design Decisions
//! - Generators may be async (identity or grant lookups) and must finish
//!   before evaluation starts
//! - Identity is opaque: the host puts it in request extensions and the
//!   generator reads it back by type
//! - Plain closures returning a future implement [`PolicyGenerator`]

use std::future::Future;
use std::sync::Arc;

use axum::http::{Extensions, Method};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::PolicyGenerationError;
use crate::http::request::RequestDescriptor;
use crate::policy::Policy;
use crate::routing::PathTemplate;

/// One `(template, method)` pair exposed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteEntry {
    pub template: PathTemplate,
    pub method: Method,
}

/// The host's route table, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, template: PathTemplate, method: Method) {
        let entry = RouteEntry { template, method };
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct templates, first-registration order.
    pub fn templates(&self) -> Vec<PathTemplate> {
        let mut out: Vec<PathTemplate> = Vec::new();
        for entry in &self.entries {
            if !out.contains(&entry.template) {
                out.push(entry.template.clone());
            }
        }
        out
    }

    /// Distinct templates other than those listed in `excluded`.
    pub fn templates_except(&self, excluded: &[PathTemplate]) -> Vec<PathTemplate> {
        self.templates()
            .into_iter()
            .filter(|t| !excluded.contains(t))
            .collect()
    }
}

impl FromIterator<RouteEntry> for RouteTable {
    fn from_iter<T: IntoIterator<Item = RouteEntry>>(iter: T) -> Self {
        let mut table = RouteTable::new();
        for entry in iter {
            table.push(entry.template, entry.method);
        }
        table
    }
}

/// Everything a policy generator can look at.
#[derive(Debug, Clone)]
pub struct PolicyContext {
    pub request: RequestDescriptor,
    /// Request extensions; identities resolved by the host live here.
    pub extensions: Extensions,
    pub routes: Arc<RouteTable>,
}

impl PolicyContext {
    pub fn new(request: RequestDescriptor) -> Self {
        Self {
            request,
            extensions: Extensions::new(),
            routes: Arc::new(RouteTable::new()),
        }
    }

    /// Look up a host-resolved value, such as the caller's identity.
    pub fn identity<T: Clone + Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}

/// Produces the policy for one request.
pub trait PolicyGenerator: Send + Sync + 'static {
    fn generate(&self, ctx: PolicyContext) -> BoxFuture<'static, Result<Policy, PolicyGenerationError>>;
}

impl<F, Fut> PolicyGenerator for F
where
    F: Fn(PolicyContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Policy, PolicyGenerationError>> + Send + 'static,
{
    fn generate(&self, ctx: PolicyContext) -> BoxFuture<'static, Result<Policy, PolicyGenerationError>> {
        (self)(ctx).boxed()
    }
}

/// Hands out clones of one fixed policy.
#[derive(Debug, Clone)]
pub struct StaticPolicy(pub Policy);

impl PolicyGenerator for StaticPolicy {
    fn generate(&self, _ctx: PolicyContext) -> BoxFuture<'static, Result<Policy, PolicyGenerationError>> {
        let policy = self.0.clone();
        async move { Ok(policy) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> PathTemplate {
        PathTemplate::parse(raw).unwrap()
    }

    #[test]
    fn test_route_table_templates() {
        let mut table = RouteTable::new();
        table.push(t("/test"), Method::GET);
        table.push(t("/test"), Method::POST);
        table.push(t("/search"), Method::POST);
        table.push(t("/search"), Method::POST);

        assert_eq!(table.entries().len(), 3);
        assert_eq!(table.templates(), vec![t("/test"), t("/search")]);
        assert_eq!(table.templates_except(&[t("/search")]), vec![t("/test")]);
    }

    #[derive(Debug, Clone, PartialEq)]
    struct User(&'static str);

    #[tokio::test]
    async fn test_closure_generator_reads_identity() {
        let generator = |ctx: PolicyContext| async move {
            let user = ctx
                .identity::<User>()
                .ok_or_else(|| PolicyGenerationError::new("no user"))?;
            Ok::<_, PolicyGenerationError>(Policy::default().with_metadata("user", user.0))
        };

        let request = RequestDescriptor::from_raw_path(Method::GET, "/x");
        let mut ctx = PolicyContext::new(request);
        assert!(generator.generate(ctx.clone()).await.is_err());

        ctx.extensions.insert(User("test"));
        let policy = generator.generate(ctx).await.unwrap();
        assert_eq!(policy.metadata["user"], "test");
    }

    #[tokio::test]
    async fn test_static_policy() {
        let generator = StaticPolicy(Policy::default().with_default_deny(false));
        let ctx = PolicyContext::new(RequestDescriptor::from_raw_path(Method::GET, "/"));
        assert!(!generator.generate(ctx).await.unwrap().default_deny);
    }
}
