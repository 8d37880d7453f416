//! Error taxonomy shared by every subsystem.
//!
//! Configuration problems surface when rules are built and never reach
//! request time. Denials are expected per-request outcomes and stay
//! distinguishable from server failures.

use thiserror::Error;

/// A rule, template or transformation could not be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Regex pattern failed to compile.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Numeric threshold is NaN or infinite.
    #[error("numeric threshold must be finite, got {0}")]
    InvalidThreshold(f64),

    /// The same placeholder appears twice in one template.
    #[error("duplicate placeholder `{name}` in path template `{template}`")]
    DuplicatePlaceholder { template: String, name: String },

    /// `{}` with no name.
    #[error("empty placeholder in path template `{0}`")]
    EmptyPlaceholder(String),

    /// Catch-all segments (`{*rest}`) change the segment count and are rejected.
    #[error("catch-all segment `{segment}` is not supported in path template `{template}`")]
    WildcardSegment { template: String, segment: String },

    #[error("path template `{0}` must start with `/`")]
    RelativeTemplate(String),

    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),

    /// `all_of` with nothing inside it.
    #[error("constraint `all_of` needs at least one member")]
    EmptyConstraintGroup,
}

/// The external policy collaborator failed to produce a policy.
#[derive(Debug, Error)]
#[error("policy generation failed: {message}")]
pub struct PolicyGenerationError {
    message: String,
}

impl PolicyGenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A request transformation failed while mutating handler arguments.
#[derive(Debug, Error)]
pub enum TransformationError {
    /// The payload could not be read as the shape the transformation expects.
    #[error("request body rejected: {0}")]
    InvalidBody(String),

    /// Policy metadata lacks a field the transformation relies on.
    #[error("policy metadata field `{0}` is missing or malformed")]
    Metadata(String),

    #[error("transformation failed: {0}")]
    Failed(String),
}

impl From<serde_json::Error> for TransformationError {
    fn from(err: serde_json::Error) -> Self {
        TransformationError::InvalidBody(err.to_string())
    }
}

/// Per-request outcome of the gateway when the downstream handler must not run.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// Policy evaluated to DENY.
    #[error("Forbidden")]
    Denied,

    #[error(transparent)]
    PolicyGeneration(#[from] PolicyGenerationError),

    #[error(transparent)]
    Transformation(#[from] TransformationError),
}

impl AuthorizationError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthorizationError::Denied => "denied",
            AuthorizationError::PolicyGeneration(_) => "policy_generation",
            AuthorizationError::Transformation(_) => "transformation",
        }
    }
}
