//! Prefix tree compiled from a route table.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. Every pattern
//! segment becomes one edge, keyed by its raw text: `{id}` and `{slug:[a-z]+}` are two
//! distinct children even though both are placeholders. A route hangs off the node its
//! last segment leads to; one node may hold routes for several methods.
//!
//! Placeholder constraints are compiled the first time a request reaches them and
//! cached on the edge.

use std::{collections::HashMap, sync::Arc};

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::route::{Route, Segment, constraint_regex, segments};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(usize);

pub(crate) const ROOT: NodeId = NodeId(0);

/// A placeholder edge.
#[derive(Debug)]
pub(crate) struct ParamEdge {
    pub(crate) key: String,
    pub(crate) name: String,
    pub(crate) constraint: Option<String>,
    regex: OnceCell<Option<Regex>>,
    pub(crate) node: NodeId,
}

impl ParamEdge {
    /// Whether the whole `segment` satisfies this placeholder.
    pub(crate) fn accepts(&self, segment: &str) -> bool {
        let Some(constraint) = &self.constraint else {
            return true;
        };

        self.regex
            .get_or_init(|| match constraint_regex(constraint) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::warn!(
                        key = %self.key,
                        error = %err,
                        "route constraint does not compile"
                    );
                    None
                }
            })
            .as_ref()
            .is_some_and(|re| re.is_match(segment))
    }
}

#[derive(Debug, Default)]
pub(crate) struct Node {
    pub(crate) statics: HashMap<String, NodeId>,
    /// Placeholder edges in insertion order.
    pub(crate) params: Vec<ParamEdge>,
    pub(crate) routes: Vec<Arc<Route>>,
}

impl Node {
    fn child(&self, raw: &str) -> Option<NodeId> {
        self.statics.get(raw).copied().or_else(|| {
            self.params
                .iter()
                .find(|edge| edge.key == raw)
                .map(|edge| edge.node)
        })
    }
}

#[derive(Debug)]
pub struct RouteTrie {
    nodes: Vec<Node>,
    routes: usize,
}

impl RouteTrie {
    /// Builds the tree for `routes`, in order.
    pub fn compile(routes: &[Route]) -> Self {
        let mut trie = RouteTrie {
            nodes: vec![Node::default()],
            routes: 0,
        };

        for route in routes {
            let mut current = ROOT;
            for raw in segments(route.pattern()) {
                current = trie.child_or_insert(current, raw);
            }
            trie.nodes[current.0].routes.push(Arc::new(route.clone()));
            trie.routes += 1;
        }

        tracing::debug!(
            routes = trie.routes,
            nodes = trie.nodes.len(),
            "compiled route trie"
        );
        trie
    }

    fn child_or_insert(&mut self, parent: NodeId, raw: &str) -> NodeId {
        if let Some(id) = self.nodes[parent.0].child(raw) {
            return id;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::default());

        let node = &mut self.nodes[parent.0];
        match Segment::parse(raw) {
            Ok(Segment::Param { name, constraint }) => node.params.push(ParamEdge {
                key: raw.to_string(),
                name: name.to_string(),
                constraint: constraint.map(str::to_string),
                regex: OnceCell::new(),
                node: id,
            }),
            _ => {
                node.statics.insert(raw.to_string(), id);
            }
        }

        id
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes
    }
}
