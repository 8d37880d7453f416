//! Authorization middleware.
//!
//! Two integration modes:
//! - [`require_authorization`]: declarative attachment. ALLOW forwards the
//!   request untouched, DENY answers 403. No request mutation.
//! - [`authorize_and_transform`]: wrapping mode, installed by
//!   [`AuthorizedRouter`](crate::http::AuthorizedRouter). After ALLOW the
//!   registered transformations edit the JSON body and query string before
//!   the handler sees them.
//!
//! Both expect to run as a route layer so that `MatchedPath` is set.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, request::Parts, uri::PathAndQuery, HeaderValue, Request, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::error::{AuthorizationError, TransformationError};
use crate::gateway::AuthorizationGateway;
use crate::http::request::{QueryParams, RequestDescriptor};
use crate::policy::Policy;
use crate::transform::HandlerArgs;

/// Largest body buffered for transformations.
pub const MAX_TRANSFORM_BODY_BYTES: usize = 2 * 1024 * 1024;

/// The policy that allowed this request, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct AuthorizedPolicy(pub Arc<Policy>);

pub async fn require_authorization(
    State(gateway): State<AuthorizationGateway>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let descriptor = RequestDescriptor::from_request(&req);
    let ctx = gateway.context(descriptor, req.extensions().clone());

    match gateway.check(&ctx).await {
        Ok(policy) => {
            req.extensions_mut().insert(AuthorizedPolicy(Arc::new(policy)));
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

pub async fn authorize_and_transform(
    State(gateway): State<AuthorizationGateway>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let descriptor = RequestDescriptor::from_request(&req);
    let ctx = gateway.context(descriptor, req.extensions().clone());

    let policy = match gateway.check(&ctx).await {
        Ok(policy) => policy,
        Err(e) => return e.into_response(),
    };

    let (mut parts, body) = req.into_parts();

    if !gateway.transformations().has_any_for(&ctx.request) {
        parts.extensions.insert(AuthorizedPolicy(Arc::new(policy)));
        return next.run(Request::from_parts(parts, body)).await;
    }

    let bytes = match axum::body::to_bytes(body, MAX_TRANSFORM_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AuthorizationError::from(TransformationError::InvalidBody(e.to_string()))
                .into_response();
        }
    };

    // Non-JSON payloads are passed through; transformations see no body.
    let original_body: Option<Value> = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };

    let mut args = HandlerArgs::new(original_body.clone(), ctx.request.query.clone());
    if let Err(e) = gateway.transform(&ctx.request, &policy, &mut args) {
        return e.into_response();
    }
    let (new_body, new_query) = args.into_parts();

    if new_query != ctx.request.query {
        if let Err(e) = rewrite_query(&mut parts, &new_query) {
            return AuthorizationError::from(e).into_response();
        }
    }

    let body = match new_body {
        Some(value) if Some(&value) != original_body.as_ref() => match encode_body(&mut parts, &value) {
            Ok(bytes) => Body::from(bytes),
            Err(e) => return AuthorizationError::from(e).into_response(),
        },
        _ => Body::from(bytes),
    };

    parts.extensions.insert(AuthorizedPolicy(Arc::new(policy)));
    next.run(Request::from_parts(parts, body)).await
}

fn rewrite_query(parts: &mut Parts, query: &QueryParams) -> Result<(), TransformationError> {
    let path = parts.uri.path();
    let path_and_query = if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query.to_query_string())
    };

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| TransformationError::Failed(format!("rewritten query is invalid: {}", e)))?,
    );
    parts.uri = Uri::from_parts(uri_parts)
        .map_err(|e| TransformationError::Failed(format!("rewritten uri is invalid: {}", e)))?;
    Ok(())
}

fn encode_body(parts: &mut Parts, value: &Value) -> Result<Bytes, TransformationError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| TransformationError::Failed(format!("cannot encode body: {}", e)))?;
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts.headers.remove(header::TRANSFER_ENCODING);
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    Ok(Bytes::from(bytes))
}
