//! Route registration with authorization.
//!
//! # Responsibilities
//! - Register handlers by `(path template, method)` and remember the table
//! - Wrap every registered route with the authorization middleware
//! - Offer declarative attachment for routers built elsewhere
//!
//! # Design Decisions
//! - The recorded route table is what policy generators enumerate when
//!   they build rules covering "all routes"
//! - Routes sharing a path are merged into one `MethodRouter`
//! - Templates are validated at registration, before the server starts

use axum::{
    handler::Handler,
    http::Method,
    middleware,
    routing::{MethodFilter, MethodRouter},
    Extension, Router,
};

use crate::error::ConfigurationError;
use crate::gateway::{AuthorizationGateway, RouteTable};
use crate::http::middleware::{authorize_and_transform, require_authorization};
use crate::http::request::RouteTemplate;
use crate::routing::PathTemplate;

/// Router builder whose routes all pass through the authorization gateway.
pub struct AuthorizedRouter<S = ()> {
    routes: Vec<(PathTemplate, MethodRouter<S>)>,
    table: RouteTable,
}

impl<S> Default for AuthorizedRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> AuthorizedRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            table: RouteTable::new(),
        }
    }

    /// Register `handler` for `method` on `path`.
    pub fn route<H, T>(mut self, path: &str, method: Method, handler: H) -> Result<Self, ConfigurationError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let template = PathTemplate::parse(path)?;
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| ConfigurationError::InvalidMethod(method.to_string()))?;

        self.table.push(template.clone(), method);

        match self.routes.iter().position(|(t, _)| *t == template) {
            Some(idx) => {
                let (t, existing) = self.routes.remove(idx);
                self.routes.insert(idx, (t, existing.on(filter, handler)));
            }
            None => self.routes.push((template, axum::routing::on(filter, handler))),
        }
        Ok(self)
    }

    pub fn get<H, T>(self, path: &str, handler: H) -> Result<Self, ConfigurationError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(path, Method::GET, handler)
    }

    pub fn post<H, T>(self, path: &str, handler: H) -> Result<Self, ConfigurationError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(path, Method::POST, handler)
    }

    pub fn put<H, T>(self, path: &str, handler: H) -> Result<Self, ConfigurationError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(path, Method::PUT, handler)
    }

    pub fn patch<H, T>(self, path: &str, handler: H) -> Result<Self, ConfigurationError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(path, Method::PATCH, handler)
    }

    pub fn delete<H, T>(self, path: &str, handler: H) -> Result<Self, ConfigurationError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(path, Method::DELETE, handler)
    }

    /// Routes registered so far.
    pub fn route_table(&self) -> &RouteTable {
        &self.table
    }

    /// Build the axum router, wrapping every route with `gateway`.
    ///
    /// The gateway is given this router's route table. Each route carries
    /// its registered template, so rules keep matching when the result is
    /// nested under a prefix.
    pub fn into_router(self, gateway: AuthorizationGateway) -> Router<S> {
        let gateway = gateway.with_routes(self.table.clone());

        for entry in self.table.entries() {
            tracing::info!(
                path_template = %entry.template,
                method = %entry.method,
                "Wrapping route with authorization"
            );
        }

        self.routes
            .into_iter()
            .fold(Router::new(), |router, (template, method_router)| {
                let guarded = method_router
                    .route_layer(middleware::from_fn_with_state(
                        gateway.clone(),
                        authorize_and_transform,
                    ))
                    .route_layer(Extension(RouteTemplate(template.clone())));
                router.route(template.as_str(), guarded)
            })
    }
}

/// Attach ALLOW/DENY enforcement to an existing router.
///
/// Only routes already added to `router` are covered. No transformations run.
/// Rules see the template axum matched, including any nest prefix, so attach
/// this after nesting. The router's routes cannot be enumerated from here:
/// pass a gateway built with [`AuthorizationGateway::with_routes`] when the
/// policy has rules covering all routes.
pub fn require_authorization_on<S>(router: Router<S>, gateway: AuthorizationGateway) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if gateway.routes().is_empty() {
        tracing::warn!("Attaching authorization without a route table; all-routes rules will match nothing");
    }
    router.route_layer(middleware::from_fn_with_state(gateway, require_authorization))
}
