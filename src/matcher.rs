//! Walks a compiled [`RouteTrie`] to find the route for a request.
//!
//! At each depth an exact static child wins. Otherwise the placeholder children are
//! tried, those with a regex constraint first and unconstrained ones after, each group
//! in registration order. The first placeholder that accepts the segment is taken and
//! never revisited: if the descent later dead-ends, matching fails rather than trying
//! a sibling. Two constrained siblings that both accept a segment resolve to the one
//! registered first.

use std::sync::Arc;

use crate::{
    params::PathParams,
    route::{Method, Route, segments},
    trie::{NodeId, ROOT, RouteTrie},
};

/// A matched route together with the bindings extracted on the way down.
#[derive(Clone, Debug)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: PathParams,
}

pub struct Matcher<'t> {
    trie: &'t RouteTrie,
}

impl<'t> Matcher<'t> {
    pub fn new(trie: &'t RouteTrie) -> Self {
        Self { trie }
    }

    /// Finds the route registered for `method` at the normalized `path`.
    ///
    /// `None` is the not-found signal; it is an ordinary outcome, not an error.
    pub fn find(&self, path: &str, method: Method) -> Option<RouteMatch> {
        let (node, params) = self.descend(path)?;
        let route = self
            .trie
            .node(node)
            .routes
            .iter()
            .find(|r| r.method() == method)?
            .clone();

        tracing::trace!(%method, path, pattern = route.pattern(), "route matched");
        Some(RouteMatch { route, params })
    }

    /// Follows `path` to its terminal node.
    fn descend(&self, path: &str) -> Option<(NodeId, PathParams)> {
        let mut node = ROOT;
        let mut params = PathParams::default();

        for segment in segments(path) {
            let current = self.trie.node(node);

            if let Some(&next) = current.statics.get(segment) {
                node = next;
                continue;
            }

            if segment.is_empty() {
                return None;
            }

            let constrained = current.params.iter().filter(|e| e.constraint.is_some());
            let open = current.params.iter().filter(|e| e.constraint.is_none());
            let edge = constrained.chain(open).find(|e| e.accepts(segment))?;

            params.push(&edge.name, segment);
            node = edge.node;
        }

        Some((node, params))
    }
}
