//! Route permissions.
//!
//! # Responsibilities
//! - Describe a rule: path templates, methods, path and query constraints
//! - Decide whether a request falls under the rule
//!
//! # Design Decisions
//! - Axes combine with AND semantics; an empty axis matches everything
//! - Template membership is by template string when the router resolved
//!   one; otherwise each template is tried against the raw path and the
//!   first that matches supplies the path parameters, percent-decoded
//! - Method comparison is case-insensitive
//! - Immutable once built; every fallible check happens in `build`

use std::collections::BTreeMap;
use std::fmt;

use axum::http::Method;

use crate::error::ConfigurationError;
use crate::http::request::RequestDescriptor;
use crate::routing::{
    decode_path_params, satisfies, satisfies_any, ParameterConstraint, PathParams, PathTemplate,
};

/// A matchable authorization rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutePermission {
    path_templates: Vec<PathTemplate>,
    methods: Vec<Method>,
    path_params: BTreeMap<String, ParameterConstraint>,
    query_params: BTreeMap<String, ParameterConstraint>,
}

impl RoutePermission {
    pub fn builder() -> RoutePermissionBuilder {
        RoutePermissionBuilder::default()
    }

    /// Rule over `paths` and `methods` with no parameter constraints.
    pub fn new<P, M>(paths: P, methods: M) -> Result<Self, ConfigurationError>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        Self::builder().paths(paths).methods(methods).build()
    }

    /// The rule that matches every request.
    pub fn any() -> Self {
        Self::default()
    }

    /// The same rule over another set of already-parsed templates.
    pub fn with_path_templates<I>(mut self, templates: I) -> Self
    where
        I: IntoIterator<Item = PathTemplate>,
    {
        self.path_templates.clear();
        for template in templates {
            if !self.path_templates.contains(&template) {
                self.path_templates.push(template);
            }
        }
        self
    }

    pub fn path_templates(&self) -> &[PathTemplate] {
        &self.path_templates
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn path_params(&self) -> &BTreeMap<String, ParameterConstraint> {
        &self.path_params
    }

    pub fn query_params(&self) -> &BTreeMap<String, ParameterConstraint> {
        &self.query_params
    }

    /// True iff every declared axis matches the request.
    pub fn matches(&self, request: &RequestDescriptor) -> bool {
        let raw_bindings;
        let path_params: &PathParams = if self.path_templates.is_empty() {
            &request.path_params
        } else {
            match &request.path_template {
                Some(template) => {
                    if !self.path_templates.contains(template) {
                        return false;
                    }
                    &request.path_params
                }
                None => match self.match_raw_path(request) {
                    Some(bindings) => {
                        raw_bindings = bindings;
                        &raw_bindings
                    }
                    None => return false,
                },
            }
        };

        if !self.matches_method(&request.method) {
            return false;
        }

        let path_ok = self.path_params.iter().all(|(name, constraint)| {
            path_params
                .get(name)
                .is_some_and(|value| satisfies(value, constraint))
        });
        if !path_ok {
            return false;
        }

        self.query_params
            .iter()
            .all(|(name, constraint)| satisfies_any(request.query.get_all(name), constraint))
    }

    fn matches_method(&self, method: &Method) -> bool {
        self.methods.is_empty()
            || self
                .methods
                .iter()
                .any(|m| m.as_str().eq_ignore_ascii_case(method.as_str()))
    }

    fn match_raw_path(&self, request: &RequestDescriptor) -> Option<PathParams> {
        let bindings = self
            .path_templates
            .iter()
            .find_map(|template| template.match_path(&request.path))
            .map(decode_path_params)?;
        let mut params = request.path_params.clone();
        params.extend(bindings);
        Some(params)
    }
}

impl fmt::Display for RoutePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
        let paths: Vec<&str> = self.path_templates.iter().map(PathTemplate::as_str).collect();
        write!(
            f,
            "[{}] [{}]",
            if methods.is_empty() { "*".to_string() } else { methods.join(",") },
            if paths.is_empty() { "*".to_string() } else { paths.join(",") },
        )?;
        for (name, c) in &self.path_params {
            write!(f, " path.{} {}", name, c)?;
        }
        for (name, c) in &self.query_params {
            write!(f, " query.{} {}", name, c)?;
        }
        Ok(())
    }
}

/// Builder for [`RoutePermission`]; validation happens in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct RoutePermissionBuilder {
    paths: Vec<String>,
    methods: Vec<String>,
    path_params: BTreeMap<String, ParameterConstraint>,
    query_params: BTreeMap<String, ParameterConstraint>,
}

impl RoutePermissionBuilder {
    pub fn path(mut self, template: impl Into<String>) -> Self {
        self.paths.push(template.into());
        self
    }

    pub fn paths<P>(mut self, templates: P) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        self.paths
            .extend(templates.into_iter().map(|p| p.as_ref().to_string()));
        self
    }

    pub fn method(mut self, method: impl AsRef<str>) -> Self {
        self.methods.push(method.as_ref().to_string());
        self
    }

    pub fn methods<M>(mut self, methods: M) -> Self
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        self.methods
            .extend(methods.into_iter().map(|m| m.as_ref().to_string()));
        self
    }

    pub fn path_param(mut self, name: impl Into<String>, constraint: ParameterConstraint) -> Self {
        self.path_params.insert(name.into(), constraint);
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, constraint: ParameterConstraint) -> Self {
        self.query_params.insert(name.into(), constraint);
        self
    }

    pub fn build(self) -> Result<RoutePermission, ConfigurationError> {
        let mut path_templates: Vec<PathTemplate> = Vec::with_capacity(self.paths.len());
        for raw in &self.paths {
            let template = PathTemplate::parse(raw)?;
            if !path_templates.contains(&template) {
                path_templates.push(template);
            }
        }

        let mut methods: Vec<Method> = Vec::with_capacity(self.methods.len());
        for raw in &self.methods {
            let method = parse_method(raw)?;
            if !methods.contains(&method) {
                methods.push(method);
            }
        }

        Ok(RoutePermission {
            path_templates,
            methods,
            path_params: self.path_params,
            query_params: self.query_params,
        })
    }
}

fn parse_method(raw: &str) -> Result<Method, ConfigurationError> {
    let normalized = raw.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Err(ConfigurationError::InvalidMethod(raw.to_string()));
    }
    Method::from_bytes(normalized.as_bytes())
        .map_err(|_| ConfigurationError::InvalidMethod(raw.to_string()))
}
