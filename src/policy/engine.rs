//! Policy evaluation.
//!
//! # Responsibilities
//! - Hold one request's allow and deny rule lists, default and metadata
//! - Resolve a request descriptor to ALLOW or DENY
//!
//! # Design Decisions
//! - Deny overrides allow unless the policy opts into allow-overrides
//! - First match in the checked list decides; later rules are not evaluated
//! - Falls back to `default_deny` when nothing matches
//! - Evaluation never fails and keeps no state between calls

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::request::RequestDescriptor;
use crate::policy::permission::RoutePermission;

/// Outcome of evaluating a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which list wins when both contain a matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    /// Deny rules are checked first; any match denies.
    #[default]
    DenyOverrides,
    /// Allow rules are checked first; any match allows.
    AllowOverrides,
}

/// What decided a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// Index into `Policy::deny`.
    DenyRule(usize),
    /// Index into `Policy::allow`.
    AllowRule(usize),
    /// No rule matched.
    Default,
}

impl DecisionSource {
    pub fn label(self) -> &'static str {
        match self {
            DecisionSource::DenyRule(_) => "deny_rule",
            DecisionSource::AllowRule(_) => "allow_rule",
            DecisionSource::Default => "default",
        }
    }
}

/// A decision together with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub decision: Decision,
    pub source: DecisionSource,
}

/// Allow and deny rules for one request.
///
/// `metadata` is opaque to evaluation and is handed to request
/// transformations, e.g. the set of collections the caller may read.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub allow: Vec<RoutePermission>,
    pub deny: Vec<RoutePermission>,
    pub default_deny: bool,
    pub precedence: Precedence,
    pub metadata: Map<String, Value>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allow: Vec::new(),
            deny: Vec::new(),
            default_deny: true,
            precedence: Precedence::default(),
            metadata: Map::new(),
        }
    }
}

impl Policy {
    pub fn new(allow: Vec<RoutePermission>, deny: Vec<RoutePermission>) -> Self {
        Self {
            allow,
            deny,
            ..Self::default()
        }
    }

    pub fn with_default_deny(mut self, default_deny: bool) -> Self {
        self.default_deny = default_deny;
        self
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Resolve `request` to ALLOW or DENY.
    pub fn evaluate(&self, request: &RequestDescriptor) -> Decision {
        self.explain(request).decision
    }

    /// Like [`evaluate`](Self::evaluate) but also reports which rule decided.
    pub fn explain(&self, request: &RequestDescriptor) -> Resolution {
        let first_deny = || self.deny.iter().position(|rule| rule.matches(request));
        let first_allow = || self.allow.iter().position(|rule| rule.matches(request));

        let matched = match self.precedence {
            Precedence::DenyOverrides => first_deny()
                .map(DecisionSource::DenyRule)
                .or_else(|| first_allow().map(DecisionSource::AllowRule)),
            Precedence::AllowOverrides => first_allow()
                .map(DecisionSource::AllowRule)
                .or_else(|| first_deny().map(DecisionSource::DenyRule)),
        };

        let resolution = match matched {
            Some(source @ DecisionSource::DenyRule(_)) => Resolution {
                decision: Decision::Deny,
                source,
            },
            Some(source) => Resolution {
                decision: Decision::Allow,
                source,
            },
            None => Resolution {
                decision: if self.default_deny {
                    Decision::Deny
                } else {
                    Decision::Allow
                },
                source: DecisionSource::Default,
            },
        };

        tracing::debug!(
            path = %request.path,
            path_template = request.template_str().unwrap_or("-"),
            method = %request.method,
            decision = %resolution.decision,
            source = ?resolution.source,
            "Policy evaluated"
        );

        resolution
    }
}
