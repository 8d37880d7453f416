//! Request descriptors.
//!
//! # Responsibilities
//! - Capture what authorization needs from a request: path, matched
//!   template, method, path parameters and multi-valued query parameters
//! - Build that descriptor from axum request parts
//!
//! # Design Decisions
//! - Query strings are parsed without squashing repeated keys and blank
//!   values are kept
//! - Path parameters are bound from the matched template, so handlers and
//!   rules see the same names
//! - A descriptor without a template is matched in raw-path mode

use axum::extract::MatchedPath;
use axum::http::request::Parts;
use axum::http::{Extensions, Method, Request, Uri};
use url::form_urlencoded;

use crate::routing::{decode_path_params, PathParams, PathTemplate};

/// Ordered, possibly repeated query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw (still encoded) query string.
    pub fn parse(query: &str) -> Self {
        let pairs = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// Every value supplied for `key`, in request order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn first<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        self.get_all(key).next()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Replace every value of `key` with `values`.
    pub fn set_all<I, V>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.remove(key);
        for value in values {
            self.pairs.push((key.to_string(), value.into()));
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// Keep only the `(key, value)` pairs for which `f` returns true.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &str) -> bool,
    {
        self.pairs.retain(|(k, v)| f(k, v));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Encode back into a query string.
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// The template a route was registered under, before any nest prefix.
///
/// Set by [`AuthorizedRouter`](crate::http::AuthorizedRouter) on each route
/// it wraps. Takes precedence over `MatchedPath`, which carries the full
/// prefixed template once the router is nested.
#[derive(Debug, Clone)]
pub struct RouteTemplate(pub PathTemplate);

/// Everything the policy engine looks at in a request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Path as received, still percent-encoded.
    pub path: String,
    /// Router-resolved template. `None` puts rule matching in raw-path mode.
    pub path_template: Option<PathTemplate>,
    pub method: Method,
    pub path_params: PathParams,
    pub query: QueryParams,
}

impl RequestDescriptor {
    /// Descriptor for a request the router already resolved to `template`.
    ///
    /// `path` is the path as received. Path parameters are bound by matching
    /// it against the template (or against its trailing segments when the
    /// route sits under a nest prefix) and then percent-decoded, so rules
    /// see the same values as axum's `Path` extractor. A path that does not
    /// fit leaves them empty.
    pub fn for_route(template: PathTemplate, method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let path_params = template
            .match_path(&path)
            .or_else(|| template.match_path_suffix(&path))
            .map(decode_path_params)
            .unwrap_or_default();
        Self {
            path,
            path_template: Some(template),
            method,
            path_params,
            query: QueryParams::new(),
        }
    }

    /// Descriptor with no resolved template.
    pub fn from_raw_path(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            path_template: None,
            method,
            path_params: PathParams::new(),
            query: QueryParams::new(),
        }
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_query_str(self, query: &str) -> Self {
        self.with_query(QueryParams::parse(query))
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Build from axum request parts.
    ///
    /// Uses the `RouteTemplate` extension, then `MatchedPath`, when the
    /// request went through a routed handler; otherwise the descriptor is
    /// left in raw-path mode.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::describe(&parts.method, &parts.uri, &parts.extensions)
    }

    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::describe(request.method(), request.uri(), request.extensions())
    }

    fn describe(method: &Method, uri: &Uri, extensions: &Extensions) -> Self {
        let path = uri.path().to_string();
        let query = QueryParams::parse(uri.query().unwrap_or_default());
        let template = match extensions.get::<RouteTemplate>() {
            Some(registered) => Some(registered.0.clone()),
            None => extensions
                .get::<MatchedPath>()
                .and_then(|matched| PathTemplate::parse(matched.as_str()).ok()),
        };

        let descriptor = match template {
            Some(template) => Self::for_route(template, method.clone(), path),
            None => Self::from_raw_path(method.clone(), path),
        };
        descriptor.with_query(query)
    }

    pub fn template_str(&self) -> Option<&str> {
        self.path_template.as_ref().map(PathTemplate::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[test]
    fn test_query_keeps_repeated_and_blank_values() {
        let query = QueryParams::parse("collections=a&collections=b&empty=&limit=10");
        assert_eq!(query.get_all("collections").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(query.first("empty"), Some(""));
        assert_eq!(query.first("limit"), Some("10"));
        assert_eq!(query.first("missing"), None);
        assert_eq!(query.len(), 4);
    }

    #[test]
    fn test_query_decodes_values() {
        let query = QueryParams::parse("q=hello%20world&plus=a+b");
        assert_eq!(query.first("q"), Some("hello world"));
        assert_eq!(query.first("plus"), Some("a b"));
    }

    #[test]
    fn test_query_mutation_and_encoding() {
        let mut query = QueryParams::parse("collections=a&collections=b&limit=5");
        query.set_all("collections", ["a"]);
        query.retain(|k, _| k != "limit");
        query.append("sort", "date desc");
        assert_eq!(query.to_query_string(), "collections=a&sort=date+desc");
    }

    #[test]
    fn test_for_route_binds_params() {
        let template = PathTemplate::parse("/collections/{collection_id}").unwrap();
        let descriptor =
            RequestDescriptor::for_route(template, Method::GET, "/collections/landsat");
        assert_eq!(descriptor.path_params["collection_id"], "landsat");
        assert_eq!(descriptor.template_str(), Some("/collections/{collection_id}"));
    }

    #[test]
    fn test_first_with_short_lived_key() {
        let query = QueryParams::parse("limit=10");
        let value = {
            let key = String::from("limit");
            query.first(&key).map(str::to_string)
        };
        assert_eq!(value.as_deref(), Some("10"));
    }

    #[test]
    fn test_for_route_decodes_params() {
        let template = PathTemplate::parse("/collections/{collection_id}").unwrap();
        let descriptor =
            RequestDescriptor::for_route(template, Method::GET, "/collections/s%65cret");
        assert_eq!(descriptor.path, "/collections/s%65cret");
        assert_eq!(descriptor.path_params["collection_id"], "secret");
    }

    #[test]
    fn test_registered_template_wins_over_matched_path() {
        let template = PathTemplate::parse("/collections/{collection_id}").unwrap();
        let request = Request::builder()
            .uri("/api/collections/abc")
            .extension(RouteTemplate(template))
            .body(Body::empty())
            .unwrap();

        let descriptor = RequestDescriptor::from_request(&request);
        assert_eq!(descriptor.template_str(), Some("/collections/{collection_id}"));
        assert_eq!(descriptor.path_params["collection_id"], "abc");
    }

    #[test]
    fn test_from_parts_without_matched_path() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("http://example.com/search?limit=3&limit=4")
            .body(Body::empty())
            .unwrap();
        let (parts, _) = request.into_parts();

        let descriptor = RequestDescriptor::from_parts(&parts);
        assert_eq!(descriptor.path, "/search");
        assert!(descriptor.path_template.is_none());
        assert_eq!(descriptor.method, Method::POST);
        assert_eq!(descriptor.query.get_all("limit").count(), 2);
    }
}
