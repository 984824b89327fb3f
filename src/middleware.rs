//! Onion-style middleware pipeline.
//!
//! A pipeline is an ordered list of middleware wrapped around a terminal [`Handler`].
//! Each middleware gets the request and a [`Next`] continuation. It may change the
//! request before calling `next.run(req)`, change the response afterwards, or return
//! its own response without calling `next` at all.
//!
//! Requests pass the middleware in order (first registered is outermost); responses
//! come back in reverse order. Errors are not caught here: `next.run(req).await?`
//! hands a failure straight to the enclosing layer, whose post-processing is skipped,
//! until it reaches the dispatcher.
//!
//! # Examples
//!
//! ```rust
//! use perch::middleware::Next;
//! use perch::types::{Request, Response};
//!
//! async fn powered_by(req: Request, next: Next) -> anyhow::Result<Response> {
//!     let mut res = next.run(req).await?;
//!     res.headers_mut().insert("x-powered-by", "perch".parse()?);
//!     Ok(res)
//! }
//! ```

use std::{future::Future, sync::Arc};

use crate::{
    handler::BoxHandler,
    params::PathParams,
    responder::Responder,
    types::{Request, Response},
};

pub mod json_body;
pub mod set_header;

/// A composable request/response transformer.
#[async_trait::async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn process(&self, req: Request, next: Next) -> anyhow::Result<Response>;
}

#[async_trait::async_trait]
impl<F, Fut, R> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: Responder + Send + 'static,
{
    async fn process(&self, req: Request, next: Next) -> anyhow::Result<Response> {
        Ok((self)(req, next).await?.into_response())
    }
}

pub type BoxMiddleware = Arc<dyn Middleware>;

/// The rest of the pipeline, terminal handler included.
pub struct Next {
    idx: usize,
    chain: Arc<[BoxMiddleware]>,
    endpoint: BoxHandler,
    params: PathParams,
}

impl Next {
    /// Runs the remaining middleware and then the handler.
    pub async fn run(self, req: Request) -> anyhow::Result<Response> {
        match self.chain.get(self.idx).cloned() {
            Some(mw) => {
                let next = Next {
                    idx: self.idx + 1,
                    ..self
                };
                mw.process(req, next).await
            }
            None => self.endpoint.call(req, self.params).await,
        }
    }
}

/// Middleware assembled for one dispatch.
#[derive(Default)]
pub struct Pipeline {
    middleware: Vec<BoxMiddleware>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer inside the ones already added.
    pub fn push(&mut self, mw: BoxMiddleware) -> &mut Self {
        self.middleware.push(mw);
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Runs the request through every layer and into `endpoint`.
    pub async fn run(
        self,
        req: Request,
        endpoint: BoxHandler,
        params: PathParams,
    ) -> anyhow::Result<Response> {
        Next {
            idx: 0,
            chain: self.middleware.into(),
            endpoint,
            params,
        }
        .run(req)
        .await
    }
}

impl FromIterator<BoxMiddleware> for Pipeline {
    fn from_iter<I: IntoIterator<Item = BoxMiddleware>>(iter: I) -> Self {
        Self {
            middleware: iter.into_iter().collect(),
        }
    }
}
