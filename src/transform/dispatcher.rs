//! Request transformation registry and dispatch.
//!
//! # Responsibilities
//! - Hold transformations registered at startup, keyed by path template
//! - Apply every transformation registered for a request's template,
//!   in registration order, after the policy allowed the request
//!
//! # Design Decisions
//! - Built once and shared read-only, so concurrent requests need no locks
//! - The first failing transformation stops the pass; edits made by
//!   earlier ones are not rolled back
//! - Transformations see the policy but cannot change the decision

use std::fmt;
use std::sync::Arc;

use crate::error::{ConfigurationError, TransformationError};
use crate::http::request::RequestDescriptor;
use crate::policy::Policy;
use crate::routing::PathTemplate;
use crate::transform::args::HandlerArgs;

/// Signature of a transformation body.
pub type TransformFn =
    dyn Fn(&RequestDescriptor, &Policy, &mut HandlerArgs) -> Result<(), TransformationError>
        + Send
        + Sync;

/// A mutation applied to handler arguments for a set of path templates.
#[derive(Clone)]
pub struct RequestTransformation {
    name: String,
    path_formats: Vec<PathTemplate>,
    transform: Arc<TransformFn>,
}

impl RequestTransformation {
    pub fn new<P, F>(path_formats: P, transform: F) -> Result<Self, ConfigurationError>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        F: Fn(&RequestDescriptor, &Policy, &mut HandlerArgs) -> Result<(), TransformationError>
            + Send
            + Sync
            + 'static,
    {
        let mut formats: Vec<PathTemplate> = Vec::new();
        for raw in path_formats {
            let template = PathTemplate::parse(raw.as_ref())?;
            if !formats.contains(&template) {
                formats.push(template);
            }
        }

        Ok(Self {
            name: "anonymous".to_string(),
            path_formats: formats,
            transform: Arc::new(transform),
        })
    }

    /// Name used in logs and metrics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path_formats(&self) -> &[PathTemplate] {
        &self.path_formats
    }

    /// Whether this transformation is registered for `request`.
    ///
    /// Requests without a resolved template are matched against the raw path.
    pub fn applies_to(&self, request: &RequestDescriptor) -> bool {
        match &request.path_template {
            Some(template) => self.path_formats.contains(template),
            None => self
                .path_formats
                .iter()
                .any(|format| format.match_path(&request.path).is_some()),
        }
    }

    pub fn apply(
        &self,
        request: &RequestDescriptor,
        policy: &Policy,
        args: &mut HandlerArgs,
    ) -> Result<(), TransformationError> {
        (self.transform)(request, policy, args)
    }
}

impl fmt::Debug for RequestTransformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTransformation")
            .field("name", &self.name)
            .field("path_formats", &self.path_formats)
            .finish_non_exhaustive()
    }
}

/// Ordered set of transformations, fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct TransformationRegistry {
    transformations: Vec<RequestTransformation>,
}

impl TransformationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, transformation: RequestTransformation) {
        tracing::info!(
            name = %transformation.name,
            path_formats = ?transformation.path_formats.iter().map(PathTemplate::as_str).collect::<Vec<_>>(),
            "Registered request transformation"
        );
        self.transformations.push(transformation);
    }

    pub fn with(mut self, transformation: RequestTransformation) -> Self {
        self.register(transformation);
        self
    }

    pub fn len(&self) -> usize {
        self.transformations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformations.is_empty()
    }

    /// Transformations registered for `request`, in registration order.
    pub fn matching<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> impl Iterator<Item = &'a RequestTransformation> + 'a {
        self.transformations
            .iter()
            .filter(move |t| t.applies_to(request))
    }

    pub fn has_any_for(&self, request: &RequestDescriptor) -> bool {
        self.matching(request).next().is_some()
    }

    /// Apply every matching transformation, returning how many ran.
    pub fn apply(
        &self,
        request: &RequestDescriptor,
        policy: &Policy,
        args: &mut HandlerArgs,
    ) -> Result<usize, TransformationError> {
        let mut applied = 0;
        for transformation in self.matching(request) {
            tracing::debug!(
                name = %transformation.name,
                path = %request.path,
                "Applying request transformation"
            );
            if let Err(e) = transformation.apply(request, policy, args) {
                tracing::error!(
                    name = %transformation.name,
                    path = %request.path,
                    error = %e,
                    applied,
                    "Request transformation failed"
                );
                return Err(e);
            }
            applied += 1;
        }

        if applied == 0 {
            tracing::debug!(path = %request.path, "No transformation registered for this route");
        }
        Ok(applied)
    }
}
