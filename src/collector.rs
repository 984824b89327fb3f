//! Route registration with nested groups.
//!
//! A group contributes a path prefix and a list of middleware to every route registered
//! inside its callback. Groups nest: prefixes concatenate and middleware accumulates
//! outer group first. When the callback returns, the enclosing prefix and middleware
//! are restored, so later routes are unaffected.
//!
//! # Examples
//!
//! ```rust
//! use perch::collector::RouteCollector;
//! use perch::table::RouteTable;
//!
//! # fn main() -> Result<(), perch::error::RouteError> {
//! let mut table = RouteTable::new();
//! let mut routes = RouteCollector::new(&mut table);
//!
//! routes.get("/", ("UserController", "index"), &[])?;
//! routes.group("/api", &["api"], |routes| {
//!     routes.group("/users", &[], |routes| {
//!         routes.get("/", ("UserController", "apiIndex"), &[])?;
//!         routes.get("/{id}", ("UserController", "apiShow"), &["audit"])?;
//!         Ok(())
//!     })
//! })?;
//!
//! assert_eq!(table.all()[2].pattern(), "/api/users/{id}");
//! assert_eq!(table.all()[2].middleware(), ["api", "audit"]);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use crate::{
    error::RouteError,
    handler::HandlerRef,
    route::{Method, Route},
    table::RouteTable,
};

pub struct RouteCollector<'t> {
    table: &'t mut RouteTable,
    prefix: String,
    middleware: Vec<String>,
    named_groups: HashMap<String, Vec<String>>,
}

impl<'t> RouteCollector<'t> {
    pub fn new(table: &'t mut RouteTable) -> Self {
        Self {
            table,
            prefix: String::new(),
            middleware: Vec::new(),
            named_groups: HashMap::new(),
        }
    }

    /// Defines a named middleware group, such as `"auth"` or `"api"`.
    pub fn define_group(&mut self, name: impl Into<String>, middleware: &[&str]) {
        self.named_groups.insert(
            name.into(),
            middleware.iter().map(|m| m.to_string()).collect(),
        );
    }

    /// Registers the routes in `f` with the middleware of a named group. An unknown
    /// name adds no middleware.
    pub fn use_group<F>(&mut self, name: &str, f: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut Self) -> Result<(), RouteError>,
    {
        let middleware = self.named_groups.get(name).cloned().unwrap_or_default();
        self.enter("", middleware, f)
    }

    /// Registers the routes in `f` under `prefix` with `middleware` prepended to theirs.
    pub fn group<F>(&mut self, prefix: &str, middleware: &[&str], f: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut Self) -> Result<(), RouteError>,
    {
        let middleware = middleware.iter().map(|m| m.to_string()).collect();
        self.enter(prefix, middleware, f)
    }

    fn enter<F>(&mut self, prefix: &str, middleware: Vec<String>, f: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut Self) -> Result<(), RouteError>,
    {
        let saved_prefix = self.prefix.clone();
        let saved_middleware = self.middleware.len();

        let prefix = prefix.trim_matches('/');
        if !prefix.is_empty() {
            if !self.prefix.is_empty() {
                self.prefix.push('/');
            }
            self.prefix.push_str(prefix);
        }
        self.middleware.extend(middleware);

        let result = f(self);

        self.prefix = saved_prefix;
        self.middleware.truncate(saved_middleware);
        result
    }

    /// Registers a route below the current group prefix.
    pub fn add(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Into<HandlerRef>,
        middleware: &[&str],
    ) -> Result<&mut Route, RouteError> {
        let full = format!("/{}/{}", self.prefix, path.trim_matches('/'));
        let group_middleware = self.middleware.clone();

        let route = self.table.add(method, &full, handler)?;
        route
            .with_middleware(group_middleware)
            .with_middleware(middleware.iter().copied());
        Ok(route)
    }

    pub fn get(
        &mut self,
        path: &str,
        handler: impl Into<HandlerRef>,
        middleware: &[&str],
    ) -> Result<&mut Route, RouteError> {
        self.add(Method::Get, path, handler, middleware)
    }

    pub fn post(
        &mut self,
        path: &str,
        handler: impl Into<HandlerRef>,
        middleware: &[&str],
    ) -> Result<&mut Route, RouteError> {
        self.add(Method::Post, path, handler, middleware)
    }

    pub fn put(
        &mut self,
        path: &str,
        handler: impl Into<HandlerRef>,
        middleware: &[&str],
    ) -> Result<&mut Route, RouteError> {
        self.add(Method::Put, path, handler, middleware)
    }

    pub fn patch(
        &mut self,
        path: &str,
        handler: impl Into<HandlerRef>,
        middleware: &[&str],
    ) -> Result<&mut Route, RouteError> {
        self.add(Method::Patch, path, handler, middleware)
    }

    pub fn delete(
        &mut self,
        path: &str,
        handler: impl Into<HandlerRef>,
        middleware: &[&str],
    ) -> Result<&mut Route, RouteError> {
        self.add(Method::Delete, path, handler, middleware)
    }

    pub fn head(
        &mut self,
        path: &str,
        handler: impl Into<HandlerRef>,
        middleware: &[&str],
    ) -> Result<&mut Route, RouteError> {
        self.add(Method::Head, path, handler, middleware)
    }

    pub fn options(
        &mut self,
        path: &str,
        handler: impl Into<HandlerRef>,
        middleware: &[&str],
    ) -> Result<&mut Route, RouteError> {
        self.add(Method::Options, path, handler, middleware)
    }
}
