//! Route definition, pattern syntax and per-route path matching.
//!
//! A pattern is a `/`-separated list of segments. Each segment is either literal text
//! or a placeholder: `{name}` binds any non-empty segment, `{name:regex}` binds a
//! segment only when the whole segment matches `regex`.
//!
//! # Examples
//!
//! ```rust
//! use perch::route::{Method, Route};
//! use perch::handler::HandlerRef;
//!
//! let route = Route::new(
//!     Method::Get,
//!     "/users/{id:[0-9]+}",
//!     HandlerRef::action("UserController", "show"),
//! );
//!
//! let params = route.match_path("/users/123").unwrap();
//! assert_eq!(params.get("id"), Some("123"));
//! assert!(route.match_path("/users/abc").is_none());
//! ```

use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{error::RouteError, handler::HandlerRef, params::PathParams};

static PARAM_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid parameter name regex"));

/// HTTP methods a route can be registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Options,
        Method::Head,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a method name is outside the routable set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method `{0}`")]
pub struct UnsupportedMethod(pub String);

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnsupportedMethod(s.to_string()))
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = UnsupportedMethod;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
            Method::Options => http::Method::OPTIONS,
            Method::Head => http::Method::HEAD,
        }
    }
}

/// One parsed pattern segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Static(&'a str),
    Param {
        name: &'a str,
        constraint: Option<&'a str>,
    },
}

impl<'a> Segment<'a> {
    /// Parses raw segment text. Text that only looks like a placeholder is an error.
    pub(crate) fn parse(raw: &'a str) -> Result<Self, String> {
        if raw.len() >= 2 && raw.starts_with('{') && raw.ends_with('}') {
            let inner = &raw[1..raw.len() - 1];
            let (name, constraint) = match inner.split_once(':') {
                Some((name, constraint)) => (name, Some(constraint)),
                None => (inner, None),
            };

            if !PARAM_NAME.is_match(name) {
                return Err(format!("`{raw}` has an invalid parameter name"));
            }
            if constraint == Some("") {
                return Err(format!("`{raw}` has an empty constraint"));
            }

            return Ok(Segment::Param { name, constraint });
        }

        if raw.contains(['{', '}']) {
            return Err(format!("`{raw}` mixes literal text and braces"));
        }

        Ok(Segment::Static(raw))
    }
}

/// Compiles a placeholder constraint anchored at both ends of the segment.
pub(crate) fn constraint_regex(constraint: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{constraint})$"))
}

/// Splits a normalized path into segments; the root has none.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .filter(move |_| path != "/")
}

/// Normalizes a route pattern: leading slash, no repeated slashes, no trailing slash
/// except for the root.
pub fn normalize_pattern(pattern: &str) -> String {
    let joined = pattern
        .trim()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    format!("/{joined}")
}

/// Normalizes an incoming request path: trailing slashes are stripped, the root stays `/`.
pub fn normalize_request_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Checks that a normalized pattern only contains well-formed segments with unique
/// parameter names and compilable constraints.
pub(crate) fn validate_pattern(pattern: &str) -> Result<(), RouteError> {
    let invalid = |reason: String| RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    };

    let mut names: Vec<&str> = Vec::new();
    for raw in segments(pattern) {
        match Segment::parse(raw).map_err(invalid)? {
            Segment::Static(_) => {}
            Segment::Param { name, constraint } => {
                if names.contains(&name) {
                    return Err(invalid(format!("parameter `{name}` appears twice")));
                }
                names.push(name);

                if let Some(constraint) = constraint {
                    constraint_regex(constraint)
                        .map_err(|e| invalid(format!("constraint of `{name}`: {e}")))?;
                }
            }
        }
    }

    Ok(())
}

/// A (method, pattern) binding to a handler plus the middleware attached at registration.
#[derive(Clone, Debug)]
pub struct Route {
    method: Method,
    pattern: String,
    handler: HandlerRef,
    middleware: Vec<String>,
}

impl Route {
    /// Creates a route. The pattern is stored as given; [`RouteTable::add`] is the place
    /// that normalizes and validates it.
    ///
    /// [`RouteTable::add`]: crate::table::RouteTable::add
    pub fn new(method: Method, pattern: impl Into<String>, handler: HandlerRef) -> Self {
        Self {
            method,
            pattern: pattern.into(),
            handler,
            middleware: Vec::new(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Middleware identifiers in the order they run, outermost first.
    pub fn middleware(&self) -> &[String] {
        &self.middleware
    }

    /// Appends middleware identifiers to this route.
    pub fn with_middleware<I, S>(&mut self, ids: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middleware.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Matches a normalized request path against this route's pattern alone, without
    /// the trie. Used to discover every method a path accepts.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let mut params = PathParams::default();
        let mut route_parts = segments(&self.pattern);
        let mut req_parts = segments(path);

        loop {
            match (route_parts.next(), req_parts.next()) {
                (None, None) => return Some(params),
                (Some(part), Some(value)) => match Segment::parse(part).ok()? {
                    Segment::Static(lit) if lit == value => {}
                    Segment::Static(_) => return None,
                    Segment::Param { .. } if value.is_empty() => return None,
                    Segment::Param { name, constraint } => {
                        if let Some(constraint) = constraint {
                            if !constraint_regex(constraint).ok()?.is_match(value) {
                                return None;
                            }
                        }
                        params.push(name, value);
                    }
                },
                _ => return None,
            }
        }
    }
}
