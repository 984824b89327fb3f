//! Typed errors raised while registering, resolving and caching routes.
//!
//! Registration errors are fatal to startup. Resolution errors happen per request and
//! are turned into 500 responses by the dispatcher, together with any other failure a
//! handler or middleware returns.

use std::path::PathBuf;

use thiserror::Error;

use crate::route::Method;

/// Route registration failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("duplicate route detected: [{method}] {pattern}")]
    Duplicate { method: Method, pattern: String },
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Failures of the handler and middleware resolvers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no handler registered for `{0}`")]
    UnknownHandler(String),
    #[error("no controller registered for `{0}`")]
    UnknownController(String),
    #[error("controller `{controller}` has no action `{action}`")]
    MissingAction { controller: String, action: String },
    #[error("no middleware registered for `{0}`")]
    UnknownMiddleware(String),
}

/// Route cache persistence failures.
#[derive(Debug, Error)]
pub enum RouteCacheError {
    #[error("route cache I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize routes: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("route cache {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("route [{method}] {pattern} has a closure handler and cannot be cached")]
    NotCacheable { method: Method, pattern: String },
}
