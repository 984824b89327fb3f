//! Request dispatch: preflight, matching, pipeline execution and finalization.
//!
//! For every request the dispatcher
//!
//! 1. normalizes method and path,
//! 2. answers `OPTIONS` itself with `204` and an `Allow` header when any route accepts
//!    the path (no handler or middleware runs),
//! 3. matches through the compiled trie, retrying a `HEAD` request as `GET`,
//! 4. runs global middleware, then route middleware, then the handler,
//! 5. turns a missing route into `404` and any failure (error or panic) into `500`,
//! 6. fills in default CORS headers,
//! 7. empties the body of `HEAD` responses, leaving headers as computed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use perch::dispatcher::Dispatcher;
//! use perch::resolver::Registry;
//! use perch::route::Method;
//! use perch::table::RouteTable;
//! use perch::params::PathParams;
//! use perch::types::Request;
//!
//! # async fn example(req: Request) -> anyhow::Result<()> {
//! let registry = Arc::new(Registry::new().action(
//!     "UserController",
//!     "show",
//!     |_req: Request, p: PathParams| async move {
//!         Ok::<_, anyhow::Error>(format!("user {}", p.get("id").unwrap_or("?")))
//!     },
//! ));
//!
//! let mut table = RouteTable::new();
//! table.add(Method::Get, "/user/{id}", ("UserController", "show"))?;
//!
//! let dispatcher = Dispatcher::new(table, registry);
//! let response = dispatcher.dispatch(req).await;
//! # Ok(())
//! # }
//! ```

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use anyhow::anyhow;
use futures_util::FutureExt;
use http::{HeaderValue, StatusCode, header::ALLOW};

use crate::{
    body::PerchBody,
    cors::{CorsConfig, join_methods},
    error_page::{ErrorPage, ErrorRenderer, render_error},
    middleware::Pipeline,
    params::PathParams,
    resolver::{HandlerResolver, MiddlewareResolver, resolve},
    responder::{DefaultResponseFactory, ResponseFactory},
    route::{Method, normalize_request_path},
    table::RouteTable,
    types::{Request, Response},
};

pub struct Dispatcher {
    table: RouteTable,
    global_middleware: Vec<String>,
    handlers: Arc<dyn HandlerResolver>,
    middleware: Arc<dyn MiddlewareResolver>,
    responses: Arc<dyn ResponseFactory>,
    renderer: Option<Arc<dyn ErrorRenderer>>,
    cors: CorsConfig,
    debug: bool,
}

/// How a request left the matching stage.
enum Outcome {
    Handled(Response),
    NotFound,
}

impl Dispatcher {
    /// Creates a dispatcher resolving handlers and middleware through one collaborator,
    /// such as a [`Registry`](crate::resolver::Registry).
    pub fn new<R>(table: RouteTable, resolver: Arc<R>) -> Self
    where
        R: HandlerResolver + MiddlewareResolver,
    {
        Self::with_resolvers(table, resolver.clone(), resolver)
    }

    pub fn with_resolvers(
        table: RouteTable,
        handlers: Arc<dyn HandlerResolver>,
        middleware: Arc<dyn MiddlewareResolver>,
    ) -> Self {
        Self {
            table,
            global_middleware: Vec::new(),
            handlers,
            middleware,
            responses: Arc::new(DefaultResponseFactory),
            renderer: None,
            cors: CorsConfig::default(),
            debug: false,
        }
    }

    /// Adds a middleware applied to every route, inside the ones added before it.
    pub fn add_middleware(&mut self, id: impl Into<String>) -> &mut Self {
        self.global_middleware.push(id.into());
        self
    }

    /// In debug mode 500 responses carry the failure message. Never enable in production.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn cors(mut self, cors: CorsConfig) -> Self {
        self.cors = cors;
        self
    }

    pub fn error_renderer(mut self, renderer: Arc<dyn ErrorRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn response_factory(mut self, factory: Arc<dyn ResponseFactory>) -> Self {
        self.responses = factory;
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Mutable access for route administration. Holding it excludes dispatching.
    pub fn table_mut(&mut self) -> &mut RouteTable {
        &mut self.table
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Dispatches one request and always produces a response.
    pub async fn dispatch(&self, req: Request) -> Response {
        let raw_method = req.method().as_str().to_ascii_uppercase();
        let method = raw_method.parse::<Method>().ok();
        let path = normalize_request_path(req.uri().path()).to_string();
        let is_head = method == Some(Method::Head);

        tracing::debug!(method = %raw_method, path = %path, "dispatching request");

        let preflight = match method {
            Some(Method::Options) => self.preflight(&path),
            _ => None,
        };

        let mut res = match preflight {
            Some(res) => res,
            None => {
                let outcome = AssertUnwindSafe(self.route(req, method, &path))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(anyhow!(panic_message(panic))));

                match outcome {
                    Ok(Outcome::Handled(res)) => res,
                    Ok(Outcome::NotFound) => {
                        tracing::debug!(method = %raw_method, path = %path, "no route matched");
                        self.error_response(&ErrorPage::not_found(self.debug))
                    }
                    Err(err) => {
                        tracing::error!(
                            method = %raw_method,
                            path = %path,
                            error = ?err,
                            "request failed"
                        );
                        self.error_response(&ErrorPage::internal(&err, self.debug))
                    }
                }
            }
        };

        self.cors.apply_defaults(&mut res);

        if is_head {
            *res.body_mut() = PerchBody::empty();
        }

        res
    }

    /// Synthesized answer to `OPTIONS`, if any route accepts `path`.
    fn preflight(&self, path: &str) -> Option<Response> {
        let mut allowed = self.table.allowed_methods(path);
        if allowed.is_empty() {
            return None;
        }
        if allowed.contains(&Method::Get) && !allowed.contains(&Method::Head) {
            allowed.push(Method::Head);
        }

        let mut res = self.responses.create(StatusCode::NO_CONTENT);
        match HeaderValue::from_str(&join_methods(&allowed)) {
            Ok(v) => {
                res.headers_mut().insert(ALLOW, v);
            }
            Err(err) => tracing::warn!(error = %err, "could not encode Allow header"),
        }
        self.cors.apply_preflight(&mut res, &allowed);
        Some(res)
    }

    /// Matches and runs the pipeline. Every failure is returned, none is handled here.
    async fn route(
        &self,
        mut req: Request,
        method: Option<Method>,
        path: &str,
    ) -> anyhow::Result<Outcome> {
        let Some(method) = method else {
            return Ok(Outcome::NotFound);
        };

        let found = self.table.find(path, method).or_else(|| {
            (method == Method::Head)
                .then(|| self.table.find(path, Method::Get))
                .flatten()
        });
        let Some(matched) = found else {
            return Ok(Outcome::NotFound);
        };

        let endpoint = resolve(self.handlers.as_ref(), matched.route.handler())?;
        let pipeline = self
            .global_middleware
            .iter()
            .chain(matched.route.middleware())
            .map(|id| self.middleware.resolve_middleware(id))
            .collect::<Result<Pipeline, _>>()?;

        tracing::debug!(
            pattern = matched.route.pattern(),
            middleware = pipeline.len(),
            "route matched"
        );

        req.extensions_mut().insert::<PathParams>(matched.params.clone());
        let res = pipeline.run(req, endpoint, matched.params).await?;
        Ok(Outcome::Handled(res))
    }

    fn error_response(&self, page: &ErrorPage) -> Response {
        render_error(page, self.renderer.as_deref(), self.responses.as_ref())
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => format!("handler panicked: {msg}"),
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => format!("handler panicked: {msg}"),
            Err(_) => "handler panicked".to_string(),
        },
    }
}
