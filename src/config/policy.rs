//! Policies declared in the configuration file.
//!
//! # Responsibilities
//! - Deserialize allow/deny rules, constraints, default and metadata
//! - Compile them once into a [`PolicyBlueprint`], surfacing every
//!   configuration error at load time
//! - Instantiate a fresh [`Policy`] per request, expanding `all_routes`
//!   rules against the host's route table
//!
//! # Example
//! ```toml
//! [policy]
//! default_deny = false
//!
//! [policy.metadata]
//! collections = ["hello", "world"]
//!
//! [[policy.allow]]
//! all_routes = true
//! methods = ["GET"]
//!
//! [[policy.deny]]
//! all_routes = true
//! exclude = ["/search"]
//! methods = ["POST", "PUT", "PATCH", "DELETE"]
//!
//! [[policy.deny]]
//! paths = ["/collections/{collection_id}/items"]
//! query_params = { limit = { gt = 100 } }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigurationError, PolicyGenerationError};
use crate::gateway::{PolicyContext, PolicyGenerator, RouteTable};
use crate::policy::{Policy, Precedence, RoutePermission};
use crate::routing::{CompareOp, ParameterConstraint, PathTemplate};

/// The `[policy]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Decision when no rule matches.
    pub default_deny: bool,

    /// Which list wins when both match.
    pub precedence: Precedence,

    /// Opaque values handed to request transformations.
    pub metadata: Map<String, Value>,

    pub allow: Vec<PermissionConfig>,

    pub deny: Vec<PermissionConfig>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_deny: true,
            precedence: Precedence::default(),
            metadata: Map::new(),
            allow: Vec::new(),
            deny: Vec::new(),
        }
    }
}

/// One `[[policy.allow]]` or `[[policy.deny]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PermissionConfig {
    /// Path templates; empty means any path unless `all_routes` is set.
    pub paths: Vec<String>,

    /// Cover every route the host registered, minus `exclude`.
    pub all_routes: bool,

    /// Templates left out of `all_routes`.
    pub exclude: Vec<String>,

    /// HTTP methods; empty means any method.
    pub methods: Vec<String>,

    pub path_params: BTreeMap<String, ConstraintConfig>,

    pub query_params: BTreeMap<String, ConstraintConfig>,
}

/// A constraint as written in TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintConfig {
    Equals(String),
    Pattern(String),
    Lt(f64),
    Le(f64),
    Gt(f64),
    Ge(f64),
    Integer,
    Present,
    AllOf(Vec<ConstraintConfig>),
}

impl ConstraintConfig {
    pub fn compile(&self) -> Result<ParameterConstraint, ConfigurationError> {
        match self {
            ConstraintConfig::Equals(v) => Ok(ParameterConstraint::equals(v.clone())),
            ConstraintConfig::Pattern(p) => ParameterConstraint::pattern(p.clone()),
            ConstraintConfig::Lt(n) => ParameterConstraint::compare(CompareOp::Lt, *n),
            ConstraintConfig::Le(n) => ParameterConstraint::compare(CompareOp::Le, *n),
            ConstraintConfig::Gt(n) => ParameterConstraint::compare(CompareOp::Gt, *n),
            ConstraintConfig::Ge(n) => ParameterConstraint::compare(CompareOp::Ge, *n),
            ConstraintConfig::Integer => Ok(ParameterConstraint::Integer),
            ConstraintConfig::Present => Ok(ParameterConstraint::Present),
            ConstraintConfig::AllOf(members) => {
                let compiled = members
                    .iter()
                    .map(ConstraintConfig::compile)
                    .collect::<Result<Vec<_>, _>>()?;
                ParameterConstraint::all_of(compiled)
            }
        }
    }
}

/// Which templates a compiled rule covers.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteScope {
    /// Templates listed in the rule (possibly none: any path).
    Listed,
    /// Every enumerated route except these.
    AllRoutesExcept(Vec<PathTemplate>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PermissionBlueprint {
    scope: RouteScope,
    rule: RoutePermission,
}

impl PermissionBlueprint {
    /// The concrete rule for `routes`.
    ///
    /// `all_routes` rules that end up with no template are dropped, since an
    /// empty template set would otherwise match every path.
    pub fn instantiate(&self, routes: &RouteTable) -> Option<RoutePermission> {
        match &self.scope {
            RouteScope::Listed => Some(self.rule.clone()),
            RouteScope::AllRoutesExcept(excluded) => {
                let templates = routes.templates_except(excluded);
                if templates.is_empty() {
                    None
                } else {
                    Some(self.rule.clone().with_path_templates(templates))
                }
            }
        }
    }
}

impl PermissionConfig {
    pub fn compile(&self) -> Result<PermissionBlueprint, ConfigurationError> {
        let mut builder = RoutePermission::builder()
            .paths(&self.paths)
            .methods(&self.methods);
        for (name, constraint) in &self.path_params {
            builder = builder.path_param(name.clone(), constraint.compile()?);
        }
        for (name, constraint) in &self.query_params {
            builder = builder.query_param(name.clone(), constraint.compile()?);
        }
        let rule = builder.build()?;

        let scope = if self.all_routes {
            let excluded = self
                .exclude
                .iter()
                .map(|raw| PathTemplate::parse(raw))
                .collect::<Result<Vec<_>, _>>()?;
            RouteScope::AllRoutesExcept(excluded)
        } else {
            RouteScope::Listed
        };

        Ok(PermissionBlueprint { scope, rule })
    }
}

/// A compiled [`PolicyConfig`], ready to produce per-request policies.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyBlueprint {
    allow: Vec<PermissionBlueprint>,
    deny: Vec<PermissionBlueprint>,
    default_deny: bool,
    precedence: Precedence,
    metadata: Map<String, Value>,
}

impl PolicyConfig {
    pub fn compile(&self) -> Result<PolicyBlueprint, ConfigurationError> {
        let compile_all = |rules: &[PermissionConfig]| {
            rules
                .iter()
                .map(PermissionConfig::compile)
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(PolicyBlueprint {
            allow: compile_all(&self.allow)?,
            deny: compile_all(&self.deny)?,
            default_deny: self.default_deny,
            precedence: self.precedence,
            metadata: self.metadata.clone(),
        })
    }
}

impl PolicyBlueprint {
    /// A fresh policy for a request on a host exposing `routes`.
    pub fn instantiate(&self, routes: &RouteTable) -> Policy {
        let build = |rules: &[PermissionBlueprint]| {
            rules
                .iter()
                .filter_map(|rule| rule.instantiate(routes))
                .collect::<Vec<_>>()
        };

        Policy {
            allow: build(&self.allow),
            deny: build(&self.deny),
            default_deny: self.default_deny,
            precedence: self.precedence,
            metadata: self.metadata.clone(),
        }
    }
}

/// Policy generator backed by a hot-swappable blueprint.
#[derive(Clone)]
pub struct BlueprintGenerator {
    blueprint: Arc<ArcSwap<PolicyBlueprint>>,
}

impl BlueprintGenerator {
    pub fn new(blueprint: PolicyBlueprint) -> Self {
        Self {
            blueprint: Arc::new(ArcSwap::from_pointee(blueprint)),
        }
    }

    /// Replace the blueprint; requests already in flight keep the old one.
    pub fn replace(&self, blueprint: PolicyBlueprint) {
        self.blueprint.store(Arc::new(blueprint));
        tracing::info!("Policy blueprint replaced");
    }

    pub fn current(&self) -> Arc<PolicyBlueprint> {
        self.blueprint.load_full()
    }
}

impl PolicyGenerator for BlueprintGenerator {
    fn generate(&self, ctx: PolicyContext) -> BoxFuture<'static, Result<Policy, PolicyGenerationError>> {
        let policy = self.blueprint.load().instantiate(&ctx.routes);
        async move { Ok(policy) }.boxed()
    }
}
