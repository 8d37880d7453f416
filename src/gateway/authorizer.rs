//! The authorization gateway.
//!
//! # Responsibilities
//! - Obtain the request's policy from the generator
//! - Evaluate it and turn DENY into an authorization error
//! - In wrapping mode, run transformations and then the handler
//!
//! # Design Decisions
//! - The handler never runs after a denial or a failed generator call
//! - Once transformations start the handler is committed; a transformation
//!   failure is surfaced to the caller rather than swallowed
//! - Cheap to clone: all shared parts are behind `Arc`

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::http::Extensions;

use crate::error::AuthorizationError;
use crate::gateway::generator::{PolicyContext, PolicyGenerator, RouteTable};
use crate::http::request::RequestDescriptor;
use crate::observability::metrics;
use crate::policy::{Decision, Policy};
use crate::transform::{HandlerArgs, TransformationRegistry};

/// Composition root for authorization.
#[derive(Clone)]
pub struct AuthorizationGateway {
    generator: Arc<dyn PolicyGenerator>,
    transformations: Arc<TransformationRegistry>,
    routes: Arc<RouteTable>,
}

impl AuthorizationGateway {
    pub fn new(generator: impl PolicyGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
            transformations: Arc::new(TransformationRegistry::new()),
            routes: Arc::new(RouteTable::new()),
        }
    }

    pub fn with_transformations(mut self, transformations: TransformationRegistry) -> Self {
        self.transformations = Arc::new(transformations);
        self
    }

    /// Route table handed to generators for "all routes" style rules.
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = Arc::new(routes);
        self
    }

    pub fn transformations(&self) -> &TransformationRegistry {
        &self.transformations
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Build the generator context for one request.
    pub fn context(&self, request: RequestDescriptor, extensions: Extensions) -> PolicyContext {
        PolicyContext {
            request,
            extensions,
            routes: self.routes.clone(),
        }
    }

    /// Ask the generator for the policy of this request.
    pub async fn policy_for(&self, ctx: &PolicyContext) -> Result<Policy, AuthorizationError> {
        let start = Instant::now();
        let result = self.generator.generate(ctx.clone()).await;
        metrics::record_policy_generation(start);

        result.map_err(|e| {
            tracing::warn!(path = %ctx.request.path, error = %e, "Policy generation failed");
            let err = AuthorizationError::from(e);
            metrics::record_error(err.kind());
            err
        })
    }

    /// Evaluate an already generated policy.
    pub fn decide(&self, policy: &Policy, request: &RequestDescriptor) -> Decision {
        let resolution = policy.explain(request);
        metrics::record_decision(resolution.decision, resolution.source);

        if resolution.decision == Decision::Deny {
            tracing::info!(
                path = %request.path,
                path_template = template_label(request),
                method = %request.method,
                source = resolution.source.label(),
                "Request denied"
            );
        }
        resolution.decision
    }

    /// Generate and evaluate the policy, reporting the decision.
    ///
    /// Errors only when the policy could not be produced.
    pub async fn authorize(&self, ctx: &PolicyContext) -> Result<Decision, AuthorizationError> {
        let policy = self.policy_for(ctx).await?;
        Ok(self.decide(&policy, &ctx.request))
    }

    /// Generate and evaluate the policy, failing on DENY.
    ///
    /// Returns the policy so transformations can use its metadata.
    pub async fn check(&self, ctx: &PolicyContext) -> Result<Policy, AuthorizationError> {
        let policy = self.policy_for(ctx).await?;
        match self.decide(&policy, &ctx.request) {
            Decision::Allow => Ok(policy),
            Decision::Deny => {
                let err = AuthorizationError::Denied;
                metrics::record_error(err.kind());
                Err(err)
            }
        }
    }

    /// Apply the registered transformations for an allowed request.
    pub fn transform(
        &self,
        request: &RequestDescriptor,
        policy: &Policy,
        args: &mut HandlerArgs,
    ) -> Result<usize, AuthorizationError> {
        match self.transformations.apply(request, policy, args) {
            Ok(applied) => {
                metrics::record_transformations(template_label(request), applied);
                Ok(applied)
            }
            Err(e) => {
                tracing::error!(path = %request.path, error = %e, "Request transformation failed");
                let err = AuthorizationError::from(e);
                metrics::record_error(err.kind());
                Err(err)
            }
        }
    }

    /// Wrapping mode: authorize, transform `args`, then run `handler` with them.
    pub async fn handle<H, Fut, R>(
        &self,
        ctx: PolicyContext,
        mut args: HandlerArgs,
        handler: H,
    ) -> Result<R, AuthorizationError>
    where
        H: FnOnce(HandlerArgs) -> Fut,
        Fut: Future<Output = R>,
    {
        let policy = self.check(&ctx).await?;
        self.transform(&ctx.request, &policy, &mut args)?;
        Ok(handler(args).await)
    }
}

impl std::fmt::Debug for AuthorizationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGateway")
            .field("transformations", &self.transformations)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

/// Template used in logs and metric labels. Raw paths never become labels.
fn template_label(request: &RequestDescriptor) -> &str {
    request.template_str().unwrap_or("-")
}
