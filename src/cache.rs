//! Persisted route sets.
//!
//! A route set whose handlers are all [`StaticHandler`]s can be written to disk as JSON
//! and restored on the next start with [`RouteTable::replace`], skipping registration.
//! Closure handlers cannot be written; such a route set is always registered from code.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{RouteCacheError, RouteError},
    handler::{HandlerRef, StaticHandler},
    route::{Method, Route, normalize_pattern, validate_pattern},
    table::RouteTable,
};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    routes: Vec<CachedRoute>,
}

#[derive(Serialize, Deserialize)]
struct CachedRoute {
    method: Method,
    pattern: String,
    handler: StaticHandler,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    middleware: Vec<String>,
}

/// Where the routes of a table came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteSource {
    Cache,
    Registered,
}

#[derive(Clone, Debug)]
pub struct RouteCache {
    path: PathBuf,
}

impl RouteCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `routes` to the cache file, creating its directory if needed.
    pub fn write(&self, routes: &[Route]) -> Result<(), RouteCacheError> {
        let routes = routes
            .iter()
            .map(|route| match route.handler() {
                HandlerRef::Static(handler) => Ok(CachedRoute {
                    method: route.method(),
                    pattern: route.pattern().to_string(),
                    handler: handler.clone(),
                    middleware: route.middleware().to_vec(),
                }),
                HandlerRef::Dynamic(_) => Err(RouteCacheError::NotCacheable {
                    method: route.method(),
                    pattern: route.pattern().to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let json = serde_json::to_vec_pretty(&CacheFile {
            version: FORMAT_VERSION,
            routes,
        })?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| self.io(source))?;
        }
        fs::write(&self.path, json).map_err(|source| self.io(source))?;

        tracing::debug!(path = %self.path.display(), "route cache written");
        Ok(())
    }

    /// Reads the cached routes; `Ok(None)` means there is no cache file yet.
    pub fn read(&self) -> Result<Option<Vec<Route>>, RouteCacheError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io(source)),
        };

        let file: CacheFile =
            serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e.to_string()))?;
        if file.version != FORMAT_VERSION {
            return Err(self.corrupt(format!("unsupported format version {}", file.version)));
        }

        let routes = file
            .routes
            .into_iter()
            .map(|cached| {
                if normalize_pattern(&cached.pattern) != cached.pattern {
                    return Err(self.corrupt(format!(
                        "pattern `{}` is not normalized",
                        cached.pattern
                    )));
                }
                validate_pattern(&cached.pattern).map_err(|e| self.corrupt(e.to_string()))?;

                let mut route = Route::new(cached.method, cached.pattern, cached.handler.into());
                route.with_middleware(cached.middleware);
                Ok(route)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(routes))
    }

    /// Fills `table` from the cache, or by running `register`.
    ///
    /// The cache is only consulted and written outside debug mode. A cache that cannot
    /// be read or written is logged and otherwise ignored; only registration errors
    /// are returned.
    pub fn load_or_register<F>(
        &self,
        table: &mut RouteTable,
        debug: bool,
        register: F,
    ) -> Result<RouteSource, RouteError>
    where
        F: FnOnce(&mut RouteTable) -> Result<(), RouteError>,
    {
        if !debug {
            match self.read() {
                Ok(Some(routes)) => {
                    tracing::debug!(routes = routes.len(), "routes restored from cache");
                    table.replace(routes);
                    return Ok(RouteSource::Cache);
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "ignoring unreadable route cache"),
            }
        }

        register(table)?;

        if !debug && table.all().iter().all(|r| r.handler().is_cacheable()) {
            if let Err(err) = self.write(table.all()) {
                tracing::warn!(error = %err, "failed to write route cache");
            }
        }

        Ok(RouteSource::Registered)
    }

    fn io(&self, source: std::io::Error) -> RouteCacheError {
        RouteCacheError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn corrupt(&self, reason: String) -> RouteCacheError {
        RouteCacheError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}
