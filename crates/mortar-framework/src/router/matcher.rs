//! Path matching.
//!
//! The router hands fully composed patterns to a [`PathMatcher`] and reads
//! back the matched chain plus the extracted parameters. [`SegmentMatcher`]
//! is the built-in implementation:
//!
//! - patterns are split on `/` and must begin with one
//! - `:name` matches exactly one non-empty segment
//! - `*name` matches the rest of the path (at least one more segment, which
//!   may be empty) and must be the last segment
//! - anything else must match literally
//!
//! Routes are tried in registration order and the first match wins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::BoxedHandler;
use http::Method;
use mortar_core::{ConfigResult, ConfigurationError};

/// A composed handler chain registered for a route.
pub type Endpoint = Arc<[BoxedHandler]>;

/// Route parameters extracted from the request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// No parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the value matched for `name`.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Returns the value matched for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of matched parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the route had no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Maps `(method, pattern)` registrations to endpoints.
pub trait PathMatcher: Send + Sync {
    /// Registers `endpoint` for `method` and `pattern`.
    fn insert(&mut self, method: Method, pattern: &str, endpoint: Endpoint) -> ConfigResult<()>;

    /// Finds the endpoint for an incoming request path.
    fn find(&self, method: &Method, path: &str) -> Option<(Endpoint, Params)>;

    /// Number of registered routes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

impl Segment {
    /// Two segments collide if they match the same paths, whatever the names.
    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Param(_), Segment::Param(_)) => true,
            (Segment::CatchAll(_), Segment::CatchAll(_)) => true,
            _ => false,
        }
    }
}

struct Route {
    segments: Vec<Segment>,
    endpoint: Endpoint,
}

/// The default [`PathMatcher`].
#[derive(Default)]
pub struct SegmentMatcher {
    routes: HashMap<Method, Vec<Route>>,
}

impl SegmentMatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_pattern(pattern: &str) -> ConfigResult<Vec<Segment>> {
    let Some(rest) = pattern.strip_prefix('/') else {
        return Err(ConfigurationError::invalid_pattern(
            pattern,
            "path must begin with '/'",
        ));
    };

    let parts: Vec<&str> = rest.split('/').collect();
    let last = parts.len() - 1;
    let mut segments = Vec::with_capacity(parts.len());

    for (i, part) in parts.into_iter().enumerate() {
        let segment = if let Some(name) = part.strip_prefix(':') {
            if name.is_empty() {
                return Err(ConfigurationError::invalid_pattern(
                    pattern,
                    "parameter must be named",
                ));
            }
            Segment::Param(name.to_string())
        } else if let Some(name) = part.strip_prefix('*') {
            if name.is_empty() {
                return Err(ConfigurationError::invalid_pattern(
                    pattern,
                    "catch-all must be named",
                ));
            }
            if i != last {
                return Err(ConfigurationError::invalid_pattern(
                    pattern,
                    "catch-all must be the last segment",
                ));
            }
            Segment::CatchAll(name.to_string())
        } else {
            Segment::Literal(part.to_string())
        };
        segments.push(segment);
    }

    Ok(segments)
}

fn match_segments(segments: &[Segment], parts: &[&str]) -> Option<Params> {
    let mut params = Params::new();
    for (i, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Literal(literal) => {
                if parts.get(i).copied() != Some(literal.as_str()) {
                    return None;
                }
            }
            Segment::Param(name) => match parts.get(i) {
                Some(value) if !value.is_empty() => params.push(name.as_str(), *value),
                _ => return None,
            },
            Segment::CatchAll(name) => {
                let rest = parts.get(i..).filter(|rest| !rest.is_empty())?.join("/");
                params.push(name.as_str(), rest);
                return Some(params);
            }
        }
    }
    (parts.len() == segments.len()).then_some(params)
}

impl PathMatcher for SegmentMatcher {
    fn insert(&mut self, method: Method, pattern: &str, endpoint: Endpoint) -> ConfigResult<()> {
        let segments = parse_pattern(pattern)?;
        let routes = self.routes.entry(method.clone()).or_default();

        let collides = routes.iter().any(|route| {
            route.segments.len() == segments.len()
                && route
                    .segments
                    .iter()
                    .zip(&segments)
                    .all(|(a, b)| a.same_shape(b))
        });
        if collides {
            return Err(ConfigurationError::DuplicateRoute {
                method,
                pattern: pattern.to_string(),
            });
        }

        routes.push(Route { segments, endpoint });
        Ok(())
    }

    fn find(&self, method: &Method, path: &str) -> Option<(Endpoint, Params)> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();

        self.routes.get(method)?.iter().find_map(|route| {
            match_segments(&route.segments, &parts)
                .map(|params| (Arc::clone(&route.endpoint), params))
        })
    }

    fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }
}
