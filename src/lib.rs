//! A trie-routed HTTP dispatcher with onion middleware.
//!
//! Routes are registered in a [`RouteTable`](table::RouteTable), usually through a
//! [`RouteCollector`](collector::RouteCollector), compiled lazily into a segment trie and
//! served by a [`Dispatcher`], which runs global and route middleware around each handler
//! and turns every failure into a well-formed response.

pub mod body;
pub mod cache;
pub mod collector;
pub mod config;
pub mod cors;
pub mod dispatcher;
pub mod error;
pub mod error_page;
pub mod handler;
pub mod matcher;
pub mod middleware;
pub mod params;
pub mod resolver;
pub mod responder;
pub mod route;
pub mod server;
pub mod table;
pub mod trie;
pub mod types;

#[cfg(feature = "perch-tracing")]
pub mod tracing;

pub use dispatcher::Dispatcher;
pub use route::Method;
pub use server::serve;
