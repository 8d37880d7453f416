//! A small collection catalog guarded by the gateway.
//!
//! Serves a handful of read routes, a writable `/test` resource and a
//! `/search` endpoint. The search transformation narrows the requested
//! collections to those listed in the policy's `collections` metadata, so a
//! caller can only search what the policy grants.

use axum::{
    extract::{Path, RawQuery},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ConfigurationError, TransformationError};
use crate::gateway::AuthorizationGateway;
use crate::http::request::{QueryParams, RequestDescriptor};
use crate::http::AuthorizedRouter;
use crate::policy::Policy;
use crate::transform::{HandlerArgs, RequestTransformation, TransformationRegistry};

/// Collections the catalog knows about.
pub const COLLECTIONS: &[&str] = &["hello", "world", "not_allowed"];

/// Metadata key read by the search transformation.
pub const COLLECTIONS_METADATA_KEY: &str = "collections";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SearchBody {
    #[serde(default)]
    pub collections: Vec<String>,

    /// Everything else in the search request, passed through untouched.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestData {
    pub name: String,
    pub age: u32,
}

/// The catalog application, every route wrapped by `gateway`.
pub fn app(gateway: AuthorizationGateway) -> Result<Router, ConfigurationError> {
    let gateway = gateway.with_transformations(transformations()?);

    let router = AuthorizedRouter::new()
        .get("/test", get_test)?
        .post("/test", create_test)?
        .get("/test/{test_id}", get_test_by_id)?
        .get("/collections", list_collections)?
        .get("/collections/{collection_id}", get_collection)?
        .get("/collections/{collection_id}/items", get_items)?
        .get("/search", search_get)?
        .post("/search", search_post)?;

    Ok(router.into_router(gateway))
}

/// Transformations the catalog registers.
pub fn transformations() -> Result<TransformationRegistry, ConfigurationError> {
    let search = RequestTransformation::new(["/search"], restrict_search_collections)?
        .named("restrict_search_collections");
    Ok(TransformationRegistry::new().with(search))
}

/// Keep only the requested collections the policy grants.
///
/// Without `collections` metadata the search is left alone. POST bodies have
/// their `collections` list filtered; GET requests have each comma-separated
/// `collections` query value filtered.
pub fn restrict_search_collections(
    _request: &RequestDescriptor,
    policy: &Policy,
    args: &mut HandlerArgs,
) -> Result<(), TransformationError> {
    let Some(allowed) = allowed_collections(policy)? else {
        return Ok(());
    };
    let permitted = |c: &str| allowed.iter().any(|a| a == c);

    if args.body().is_some() {
        args.update_body(|search: &mut SearchBody| {
            search.collections.retain(|c| permitted(c.as_str()));
        })?;
    }

    let query = args.query();
    if query.contains_key("collections") {
        let filtered: Vec<String> = query
            .get_all("collections")
            .map(|value| {
                value
                    .split(',')
                    .filter(|c| permitted(*c))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();
        args.query_mut().set_all("collections", filtered);
    }

    Ok(())
}

fn allowed_collections(policy: &Policy) -> Result<Option<Vec<String>>, TransformationError> {
    match policy.metadata.get(COLLECTIONS_METADATA_KEY) {
        None => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| {
                TransformationError::Metadata(format!(
                    "'{}' must be a list of strings: {}",
                    COLLECTIONS_METADATA_KEY, e
                ))
            }),
    }
}

async fn get_test() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_test(Json(data): Json<TestData>) -> Json<Value> {
    Json(json!({ "status": "ok", "data": data }))
}

async fn get_test_by_id(Path(test_id): Path<i64>) -> Json<Value> {
    tracing::debug!(test_id, "Fetching test");
    Json(json!({ "status": "ok", "test_id": test_id }))
}

async fn list_collections() -> Json<Value> {
    Json(json!({ "collections": COLLECTIONS }))
}

async fn get_collection(Path(collection_id): Path<String>) -> Json<Value> {
    Json(json!({ "id": collection_id }))
}

async fn get_items(Path(collection_id): Path<String>, RawQuery(query): RawQuery) -> Json<Value> {
    let query = QueryParams::parse(query.as_deref().unwrap_or_default());
    Json(json!({
        "collection": collection_id,
        "limit": query.first("limit"),
        "features": [],
    }))
}

async fn search_get(RawQuery(query): RawQuery) -> Json<SearchBody> {
    let query = QueryParams::parse(query.as_deref().unwrap_or_default());
    let collections = query
        .get_all("collections")
        .flat_map(|value| value.split(','))
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    Json(SearchBody {
        collections,
        rest: Map::new(),
    })
}

async fn search_post(Json(search): Json<SearchBody>) -> Json<SearchBody> {
    Json(search)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use crate::routing::PathTemplate;

    fn search_request() -> RequestDescriptor {
        RequestDescriptor::for_route(PathTemplate::parse("/search").unwrap(), Method::POST, "/search")
    }

    fn policy() -> Policy {
        Policy::default().with_metadata("collections", json!(["hello", "world"]))
    }

    #[test]
    fn test_body_collections_filtered() {
        let mut args = HandlerArgs::with_body(json!({
            "collections": ["hello", "world", "not_allowed"],
            "limit": 10
        }));
        restrict_search_collections(&search_request(), &policy(), &mut args).unwrap();
        assert_eq!(
            args.body().unwrap(),
            &json!({ "collections": ["hello", "world"], "limit": 10 })
        );
    }

    #[test]
    fn test_query_collections_filtered() {
        let mut args = HandlerArgs::new(None, QueryParams::parse("collections=hello,nope&limit=5"));
        restrict_search_collections(&search_request(), &policy(), &mut args).unwrap();
        assert_eq!(args.query().first("collections"), Some("hello"));
        assert_eq!(args.query().first("limit"), Some("5"));
    }

    #[test]
    fn test_no_metadata_leaves_search_alone() {
        let mut args = HandlerArgs::with_body(json!({ "collections": ["anything"] }));
        restrict_search_collections(&search_request(), &Policy::default(), &mut args).unwrap();
        assert_eq!(args.body().unwrap(), &json!({ "collections": ["anything"] }));
    }

    #[test]
    fn test_empty_grant_removes_everything() {
        let policy = Policy::default().with_metadata("collections", json!([]));
        let mut args = HandlerArgs::with_body(json!({ "collections": ["hello"] }));
        restrict_search_collections(&search_request(), &policy, &mut args).unwrap();
        assert_eq!(args.body().unwrap(), &json!({ "collections": [] }));
    }

    #[test]
    fn test_malformed_metadata() {
        let policy = Policy::default().with_metadata("collections", "hello");
        let mut args = HandlerArgs::with_body(json!({ "collections": ["hello"] }));
        let err = restrict_search_collections(&search_request(), &policy, &mut args).unwrap_err();
        assert!(matches!(err, TransformationError::Metadata(_)));
    }

    #[test]
    fn test_registry_targets_search_only() {
        let registry = transformations().unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.has_any_for(&search_request()));
        let other = RequestDescriptor::for_route(PathTemplate::parse("/test").unwrap(), Method::GET, "/test");
        assert!(!registry.has_any_for(&other));
    }
}
