//! Path templates and template matching.
//!
//! # Responsibilities
//! - Parse route templates such as `/collections/{collection_id}/items`
//! - Match a concrete path against a template, binding placeholder values
//!
//! # Design Decisions
//! - Segment-delimited on `/`; segment counts must agree exactly
//! - Literal segments are compared case-sensitively
//! - Placeholders bind any segment value, including the empty string;
//!   value constraints are applied later by the constraint evaluator
//! - Matching works on the path as received; bound values are decoded
//!   separately with [`decode_path_params`]
//! - Catch-all segments are rejected at parse time

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigurationError;

/// Values bound to template placeholders.
pub type PathParams = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed route template.
///
/// Equality, ordering and hashing use the template string, so two templates
/// are the same rule target iff they are spelled the same.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template, rejecting duplicate or empty placeholder names.
    pub fn parse(template: &str) -> Result<Self, ConfigurationError> {
        if !template.starts_with('/') {
            return Err(ConfigurationError::RelativeTemplate(template.to_string()));
        }

        let mut seen = HashSet::new();
        let mut segments = Vec::new();

        for segment in template.split('/') {
            let inner = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'));

            match inner {
                Some(name) if name.starts_with('*') => {
                    return Err(ConfigurationError::WildcardSegment {
                        template: template.to_string(),
                        segment: segment.to_string(),
                    });
                }
                Some("") => {
                    return Err(ConfigurationError::EmptyPlaceholder(template.to_string()));
                }
                Some(name) => {
                    if !seen.insert(name) {
                        return Err(ConfigurationError::DuplicatePlaceholder {
                            template: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                }
                None => segments.push(Segment::Literal(segment.to_string())),
            }
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in declaration order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a concrete path, returning the placeholder bindings.
    ///
    /// Returns `None` when segment counts differ or a literal segment differs.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = path.split('/').collect();
        self.bind(&parts)
    }

    /// Match the trailing segments of `path`, ignoring any leading prefix.
    ///
    /// Used for routes served under a nest prefix the template does not
    /// spell out: `/collections/{id}` matches `/api/collections/abc`.
    pub fn match_path_suffix(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = path.split('/').collect();
        let rest = self.segments.len().checked_sub(1)?;
        if parts.len() < self.segments.len() {
            return None;
        }
        let tail: Vec<&str> = std::iter::once("")
            .chain(parts[parts.len() - rest..].iter().copied())
            .collect();
        self.bind(&tail)
    }

    fn bind(&self, parts: &[&str]) -> Option<PathParams> {
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, value) in self.segments.iter().zip(parts) {
            let value = *value;
            match segment {
                Segment::Literal(literal) => {
                    if literal != value {
                        return None;
                    }
                }
                Segment::Placeholder(name) => {
                    params.insert(name.clone(), value.to_string());
                }
            }
        }
        Some(params)
    }
}

/// Percent-decode bound values, as the axum `Path` extractor does.
///
/// Bytes that do not form UTF-8 are replaced rather than rejected.
pub fn decode_path_params(params: PathParams) -> PathParams {
    params
        .into_iter()
        .map(|(name, value)| {
            let decoded = percent_decode_str(&value).decode_utf8_lossy().into_owned();
            (name, decoded)
        })
        .collect()
}

/// Match `path` against the template string `template`.
///
/// An unparseable template never matches.
pub fn match_path(template: &str, path: &str) -> Option<PathParams> {
    PathTemplate::parse(template).ok()?.match_path(path)
}

impl PartialEq for PathTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PathTemplate {}

impl Hash for PathTemplate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for PathTemplate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathTemplate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PathTemplate {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for PathTemplate {
    type Error = ConfigurationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl Serialize for PathTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for PathTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_binding() {
        let params = match_path("/collections/{id}", "/collections/abc").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["id"], "abc");
    }

    #[test]
    fn test_segment_count_mismatch() {
        assert!(match_path("/collections/{id}", "/collections").is_none());
        assert!(match_path("/collections/{id}", "/collections/abc/items").is_none());
    }

    #[test]
    fn test_literal_mismatch() {
        assert!(match_path("/a/{x}/b", "/a/1/c").is_none());
        // Case-sensitive
        assert!(match_path("/Collections", "/collections").is_none());
    }

    #[test]
    fn test_empty_segment_binds() {
        let params = match_path("/collections/{id}", "/collections/").unwrap();
        assert_eq!(params["id"], "");
    }

    #[test]
    fn test_multiple_placeholders() {
        let template = PathTemplate::parse("/collections/{collection_id}/items/{item_id}").unwrap();
        let params = template.match_path("/collections/c1/items/i9").unwrap();
        assert_eq!(params["collection_id"], "c1");
        assert_eq!(params["item_id"], "i9");
        assert_eq!(
            template.placeholders().collect::<Vec<_>>(),
            vec!["collection_id", "item_id"]
        );
    }

    #[test]
    fn test_percent_encoding_not_decoded() {
        let params = match_path("/files/{name}", "/files/a%20b").unwrap();
        assert_eq!(params["name"], "a%20b");
    }

    #[test]
    fn test_decode_bound_values() {
        let params = match_path("/collections/{id}", "/collections/s%65cret%20x").unwrap();
        let params = decode_path_params(params);
        assert_eq!(params["id"], "secret x");
    }

    #[test]
    fn test_suffix_match_under_prefix() {
        let template = PathTemplate::parse("/collections/{id}").unwrap();
        let params = template.match_path_suffix("/api/v1/collections/abc").unwrap();
        assert_eq!(params["id"], "abc");
        assert_eq!(
            template.match_path_suffix("/collections/abc").unwrap()["id"],
            "abc"
        );
        assert!(template.match_path_suffix("/api/items/abc").is_none());
        assert!(template.match_path_suffix("/abc").is_none());
    }

    #[test]
    fn test_parse_rejects_bad_templates() {
        assert!(matches!(
            PathTemplate::parse("/a/{id}/b/{id}"),
            Err(ConfigurationError::DuplicatePlaceholder { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("/a/{}"),
            Err(ConfigurationError::EmptyPlaceholder(_))
        ));
        assert!(matches!(
            PathTemplate::parse("/static/{*rest}"),
            Err(ConfigurationError::WildcardSegment { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("collections"),
            Err(ConfigurationError::RelativeTemplate(_))
        ));
        assert!(match_path("/a/{id}/{id}", "/a/1/2").is_none());
    }

    #[test]
    fn test_root_template() {
        let template = PathTemplate::parse("/").unwrap();
        assert!(template.match_path("/").is_some());
        assert!(template.match_path("/x").is_none());
    }

    #[test]
    fn test_identity_is_template_string() {
        let a = PathTemplate::parse("/x/{id}").unwrap();
        let b: PathTemplate = "/x/{id}".parse().unwrap();
        let c = PathTemplate::parse("/x/{other}").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "/x/{id}");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<PathTemplate, _> = serde_json::from_str("\"/search\"");
        assert!(ok.is_ok());
        let bad: Result<PathTemplate, _> = serde_json::from_str("\"/a/{x}/{x}\"");
        assert!(bad.is_err());
    }
}
