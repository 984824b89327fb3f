//! The registered route set and its lazily compiled trie.
//!
//! Registration (`add`, `replace`) needs `&mut RouteTable`, so it cannot overlap with
//! request handling, which only borrows the table. Every registration drops the
//! compiled trie; the next lookup rebuilds it once and later lookups share it.

use std::{collections::HashSet, sync::Arc};

use arc_swap::ArcSwapOption;

use crate::{
    error::RouteError,
    handler::HandlerRef,
    matcher::{Matcher, RouteMatch},
    route::{Method, Route, normalize_pattern, validate_pattern},
    trie::RouteTrie,
};

#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    keys: HashSet<(Method, String)>,
    compiled: ArcSwapOption<RouteTrie>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route.
    ///
    /// The pattern is normalized first (`//users/` becomes `/users`). Registering the
    /// same method and normalized pattern twice fails with [`RouteError::Duplicate`]
    /// and leaves the table unchanged. The returned route can still receive middleware.
    pub fn add(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Into<HandlerRef>,
    ) -> Result<&mut Route, RouteError> {
        let pattern = normalize_pattern(pattern);
        validate_pattern(&pattern)?;

        if !self.keys.insert((method, pattern.clone())) {
            return Err(RouteError::Duplicate { method, pattern });
        }

        self.compiled.store(None);
        let idx = self.routes.len();
        self.routes.push(Route::new(method, pattern, handler.into()));
        Ok(&mut self.routes[idx])
    }

    /// All routes, in registration order.
    pub fn all(&self) -> &[Route] {
        &self.routes
    }

    /// Replaces the whole route set, typically with routes restored from a cache.
    /// The input is trusted: uniqueness is not re-checked.
    pub fn replace(&mut self, routes: Vec<Route>) {
        self.keys = routes
            .iter()
            .map(|r| (r.method(), r.pattern().to_string()))
            .collect();
        self.routes = routes;
        self.compiled.store(None);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.load().is_some()
    }

    /// Returns the compiled trie, building it if the table changed since the last call.
    pub fn compiled(&self) -> Arc<RouteTrie> {
        if let Some(trie) = self.compiled.load_full() {
            return trie;
        }

        let trie = Arc::new(RouteTrie::compile(&self.routes));
        self.compiled.store(Some(trie.clone()));
        trie
    }

    /// Matches through the compiled trie.
    pub fn find(&self, path: &str, method: Method) -> Option<RouteMatch> {
        Matcher::new(&self.compiled()).find(path, method)
    }

    /// Every method some route accepts for `path`, in registration order, checked
    /// route by route rather than through the trie.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut allowed = Vec::new();
        for route in &self.routes {
            if !allowed.contains(&route.method()) && route.match_path(path).is_some() {
                allowed.push(route.method());
            }
        }
        allowed
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes)
            .field("compiled", &self.is_compiled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(name: &str) -> HandlerRef {
        HandlerRef::function(name)
    }

    #[test]
    fn add_normalizes_patterns() {
        let mut table = RouteTable::new();
        let route = table.add(Method::Get, "users//{id}/", h("show")).unwrap();
        assert_eq!(route.pattern(), "/users/{id}");
        assert_eq!(route.method(), Method::Get);
    }

    #[test]
    fn duplicates_are_rejected_once_normalized() {
        let mut table = RouteTable::new();
        table.add(Method::Get, "/users", h("a")).unwrap();

        let err = table.add(Method::Get, "/users/", h("b")).unwrap_err();
        assert_eq!(
            err,
            RouteError::Duplicate {
                method: Method::Get,
                pattern: "/users".into()
            }
        );
        assert_eq!(table.len(), 1);

        table.add(Method::Post, "/users", h("c")).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        let mut table = RouteTable::new();
        assert!(matches!(
            table.add(Method::Get, "/x/{9}", h("a")),
            Err(RouteError::InvalidPattern { .. })
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn all_keeps_registration_order() {
        let mut table = RouteTable::new();
        table.add(Method::Post, "/b", h("b")).unwrap();
        table.add(Method::Get, "/a", h("a")).unwrap();
        let patterns: Vec<_> = table.all().iter().map(Route::pattern).collect();
        assert_eq!(patterns, ["/b", "/a"]);
    }

    #[test]
    fn registration_invalidates_compiled_trie() {
        let mut table = RouteTable::new();
        table.add(Method::Get, "/a", h("a")).unwrap();
        assert!(!table.is_compiled());

        let first = table.compiled();
        assert!(table.is_compiled());
        assert!(Arc::ptr_eq(&first, &table.compiled()));
        assert!(table.find("/b", Method::Get).is_none());

        table.add(Method::Get, "/b", h("b")).unwrap();
        assert!(!table.is_compiled());
        assert!(table.find("/b", Method::Get).is_some());
    }

    #[test]
    fn replace_swaps_the_route_set() {
        let mut table = RouteTable::new();
        table.add(Method::Get, "/old", h("old")).unwrap();
        table.compiled();

        table.replace(vec![Route::new(Method::Get, "/new", h("new"))]);
        assert!(!table.is_compiled());
        assert!(table.find("/old", Method::Get).is_none());
        assert!(table.find("/new", Method::Get).is_some());

        // the uniqueness index follows the replaced set
        assert!(table.add(Method::Get, "/new", h("again")).is_err());
        assert!(table.add(Method::Get, "/old", h("old")).is_ok());
    }

    #[test]
    fn allowed_methods_scan_every_route() {
        let mut table = RouteTable::new();
        table.add(Method::Get, "/items/{id}", h("show")).unwrap();
        table.add(Method::Delete, "/items/{id:[0-9]+}", h("destroy")).unwrap();
        table.add(Method::Post, "/items/{id}", h("update")).unwrap();

        assert_eq!(
            table.allowed_methods("/items/7"),
            [Method::Get, Method::Delete, Method::Post]
        );
        assert_eq!(table.allowed_methods("/items/x"), [Method::Get, Method::Post]);
        assert!(table.allowed_methods("/nothing").is_empty());
    }
}
