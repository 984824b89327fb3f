//! Turning handler and middleware identifiers into runnable instances.
//!
//! The dispatcher only ever sees routes holding identifiers. It asks a
//! [`HandlerResolver`] for the handler behind a [`StaticHandler`] and a
//! [`MiddlewareResolver`] for each middleware id, once per request. [`Registry`] is the
//! stock implementation of both: a plain map from identifiers to shared instances.
//!
//! # Examples
//!
//! ```rust
//! use perch::resolver::Registry;
//! use perch::middleware::set_header::SetHeader;
//! use perch::params::PathParams;
//! use perch::types::Request;
//!
//! let registry = Registry::new()
//!     .action("UserController", "show", |_req: Request, p: PathParams| async move {
//!         Ok::<_, anyhow::Error>(format!("user {}", p.get("id").unwrap_or("?")))
//!     })
//!     .middleware("powered-by", SetHeader::from_static("x-powered-by", "perch"));
//! ```

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::ResolveError,
    handler::{BoxHandler, Handler, HandlerRef, StaticHandler},
    middleware::{BoxMiddleware, Middleware},
};

pub trait HandlerResolver: Send + Sync + 'static {
    fn resolve_handler(&self, handler: &StaticHandler) -> Result<BoxHandler, ResolveError>;
}

pub trait MiddlewareResolver: Send + Sync + 'static {
    fn resolve_middleware(&self, id: &str) -> Result<BoxMiddleware, ResolveError>;
}

/// Resolves any [`HandlerRef`]: closures directly, descriptors through `resolver`.
pub fn resolve(
    resolver: &dyn HandlerResolver,
    handler: &HandlerRef,
) -> Result<BoxHandler, ResolveError> {
    match handler {
        HandlerRef::Static(descriptor) => resolver.resolve_handler(descriptor),
        HandlerRef::Dynamic(dynamic) => Ok(dynamic.handler()),
    }
}

#[derive(Clone, Default)]
pub struct Registry {
    functions: HashMap<String, BoxHandler>,
    invokables: HashMap<String, BoxHandler>,
    controllers: HashMap<String, HashMap<String, BoxHandler>>,
    middleware: HashMap<String, BoxMiddleware>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function<H: Handler>(mut self, name: impl Into<String>, handler: H) -> Self {
        self.functions.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn invokable<H: Handler>(mut self, name: impl Into<String>, handler: H) -> Self {
        self.invokables.insert(name.into(), Arc::new(handler));
        self
    }

    /// Registers one action of a controller, creating the controller entry if needed.
    pub fn action<H: Handler>(
        mut self,
        controller: impl Into<String>,
        action: impl Into<String>,
        handler: H,
    ) -> Self {
        self.controllers
            .entry(controller.into())
            .or_default()
            .insert(action.into(), Arc::new(handler));
        self
    }

    /// Registers a controller with no actions yet.
    pub fn controller(mut self, controller: impl Into<String>) -> Self {
        self.controllers.entry(controller.into()).or_default();
        self
    }

    pub fn middleware<M: Middleware>(mut self, id: impl Into<String>, mw: M) -> Self {
        self.middleware.insert(id.into(), Arc::new(mw));
        self
    }
}

impl HandlerResolver for Registry {
    fn resolve_handler(&self, handler: &StaticHandler) -> Result<BoxHandler, ResolveError> {
        match handler {
            StaticHandler::BoundMethod { controller, action } => self
                .controllers
                .get(controller)
                .ok_or_else(|| ResolveError::UnknownController(controller.clone()))?
                .get(action)
                .cloned()
                .ok_or_else(|| ResolveError::MissingAction {
                    controller: controller.clone(),
                    action: action.clone(),
                }),
            StaticHandler::Function(name) => self
                .functions
                .get(name)
                .cloned()
                .ok_or_else(|| ResolveError::UnknownHandler(name.clone())),
            StaticHandler::Invokable(name) => self
                .invokables
                .get(name)
                .cloned()
                .ok_or_else(|| ResolveError::UnknownHandler(name.clone())),
        }
    }
}

impl MiddlewareResolver for Registry {
    fn resolve_middleware(&self, id: &str) -> Result<BoxMiddleware, ResolveError> {
        self.middleware
            .get(id)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownMiddleware(id.to_string()))
    }
}
