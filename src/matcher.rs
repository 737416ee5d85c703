//! Method + path dispatch table shared by every router scope.
//!
//! Pattern syntax:
//! - `/users` literal segment
//! - `/users/:id` named parameter, matches exactly one segment
//! - `/static/*filepath` catch-all, last segment only, matches the rest of
//!   the path (possibly empty)
//!
//! Static patterns win over dynamic ones; dynamic patterns are tried in
//! registration order. Registering the same method twice for the same route
//! shape is rejected, parameter names are not part of the shape.
//!
//! Trailing slashes are significant here. [`Router::serve`] redirects a
//! path that only misses by one.
//!
//! [`Router::serve`]: crate::Router::serve

use crate::error::RouteError;
use crate::http::Method;
use crate::router::Route;
use std::collections::HashMap;
use std::sync::Arc;

/// Path parameters extracted for a single request, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, name: &str, value: String) {
        self.entries.push((name.to_string(), value));
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Params {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Outcome of a route table lookup.
pub enum Lookup {
    Found(Arc<Route>, Params),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Registration and dispatch capability owned by the root router and
/// handed by reference to every sub-router.
///
/// Registration happens during startup; implementations only need to
/// support lookups once serving has begun.
pub trait RouteTable: Send + Sync + 'static {
    fn insert(&mut self, method: Method, pattern: &str, route: Arc<Route>) -> Result<(), RouteError>;

    fn lookup(&self, method: Method, path: &str) -> Lookup;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    fn parse(raw: &str) -> Result<Pattern, RouteError> {
        let invalid = |reason| RouteError::InvalidPattern {
            pattern: raw.to_string(),
            reason,
        };
        if !raw.starts_with('/') {
            return Err(invalid("pattern must begin with '/'"));
        }

        let parts: Vec<&str> = raw[1..].split('/').collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (index, part) in parts.iter().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(invalid("parameter must be named"));
                }
                Segment::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                if name.is_empty() {
                    return Err(invalid("catch-all must be named"));
                }
                if index != parts.len() - 1 {
                    return Err(invalid("catch-all must be the last segment"));
                }
                Segment::CatchAll(name.to_string())
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Pattern {
            raw: raw.to_string(),
            segments,
        })
    }

    fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }

    /// Two patterns with the same shape match exactly the same paths.
    fn same_shape(&self, other: &Pattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    (Segment::CatchAll(_), Segment::CatchAll(_)) => true,
                    _ => false,
                })
    }

    fn matches(&self, path: &str) -> Option<Params> {
        let path = path.strip_prefix('/')?;
        let mut rest = path;
        let mut params = Params::default();

        for (index, segment) in self.segments.iter().enumerate() {
            let last = index == self.segments.len() - 1;
            if let Segment::CatchAll(name) = segment {
                params.push(name, rest.to_string());
                return Some(params);
            }

            let (part, remaining) = match rest.split_once('/') {
                Some((part, remaining)) if !last => (part, Some(remaining)),
                Some(_) => return None,
                None if last => (rest, None),
                None => return None,
            };

            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Param(name) if !part.is_empty() => params.push(name, part.to_string()),
                _ => return None,
            }

            rest = remaining.unwrap_or("");
        }

        Some(params)
    }
}

struct Entry {
    pattern: Pattern,
    routes: HashMap<Method, Arc<Route>>,
}

/// Default [`RouteTable`] implementation.
#[derive(Default)]
pub struct PathMatcher {
    static_routes: HashMap<String, HashMap<Method, Arc<Route>>>,
    dynamic_routes: Vec<Entry>,
}

impl PathMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn allowed(routes: &HashMap<Method, Arc<Route>>) -> Vec<Method> {
        let mut methods: Vec<Method> = routes.keys().copied().collect();
        methods.sort_by_key(|method| method.as_str());
        methods
    }
}

impl RouteTable for PathMatcher {
    fn insert(&mut self, method: Method, pattern: &str, route: Arc<Route>) -> Result<(), RouteError> {
        let parsed = Pattern::parse(pattern)?;
        let conflict = || RouteError::Conflict {
            method,
            path: pattern.to_string(),
        };

        if parsed.is_static() {
            let routes = self.static_routes.entry(parsed.raw).or_default();
            if routes.contains_key(&method) {
                return Err(conflict());
            }
            routes.insert(method, route);
            return Ok(());
        }

        if let Some(entry) = self
            .dynamic_routes
            .iter_mut()
            .find(|entry| entry.pattern.same_shape(&parsed))
        {
            if entry.routes.contains_key(&method) {
                return Err(conflict());
            }
            entry.routes.insert(method, route);
            return Ok(());
        }

        let mut routes = HashMap::new();
        routes.insert(method, route);
        self.dynamic_routes.push(Entry {
            pattern: parsed,
            routes,
        });
        Ok(())
    }

    fn lookup(&self, method: Method, path: &str) -> Lookup {
        let mut allowed = Vec::new();

        if let Some(routes) = self.static_routes.get(path) {
            if let Some(route) = routes.get(&method) {
                return Lookup::Found(Arc::clone(route), Params::default());
            }
            allowed = Self::allowed(routes);
        }

        for entry in &self.dynamic_routes {
            if let Some(params) = entry.pattern.matches(path) {
                if let Some(route) = entry.routes.get(&method) {
                    return Lookup::Found(Arc::clone(route), params);
                }
                if allowed.is_empty() {
                    allowed = Self::allowed(&entry.routes);
                }
            }
        }

        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::MethodNotAllowed(allowed)
        }
    }
}
