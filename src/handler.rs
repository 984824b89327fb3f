//! Route handlers and the references routes keep to them.
//!
//! A route never stores a callable directly. It stores a [`HandlerRef`], which is either
//! plain data naming a handler ([`StaticHandler`], resolved per request through a
//! [`HandlerResolver`](crate::resolver::HandlerResolver)) or a closure captured at
//! registration ([`DynamicHandler`]). Only the first kind can be persisted in a route cache.

use std::{fmt, future::Future, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    params::PathParams,
    responder::Responder,
    types::{Request, Response},
};

/// The terminal link of a pipeline.
#[async_trait::async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, req: Request, params: PathParams) -> anyhow::Result<Response>;
}

#[async_trait::async_trait]
impl<F, Fut, R> Handler for F
where
    F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: Responder + Send + 'static,
{
    async fn call(&self, req: Request, params: PathParams) -> anyhow::Result<Response> {
        Ok((self)(req, params).await?.into_response())
    }
}

pub type BoxHandler = Arc<dyn Handler>;

/// Serializable handler descriptors.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum StaticHandler {
    /// An action on a controller registered under `controller`.
    BoundMethod { controller: String, action: String },
    /// A free function registered by name.
    Function(String),
    /// A single-purpose handler object registered by name.
    Invokable(String),
}

impl fmt::Display for StaticHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticHandler::BoundMethod { controller, action } => write!(f, "{controller}@{action}"),
            StaticHandler::Function(name) => write!(f, "fn {name}"),
            StaticHandler::Invokable(name) => write!(f, "{name}"),
        }
    }
}

/// A handler captured as a closure at registration time.
#[derive(Clone)]
pub struct DynamicHandler(pub(crate) BoxHandler);

impl DynamicHandler {
    pub fn handler(&self) -> BoxHandler {
        self.0.clone()
    }
}

impl fmt::Debug for DynamicHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DynamicHandler(..)")
    }
}

/// What a route points at.
#[derive(Clone, Debug)]
pub enum HandlerRef {
    Static(StaticHandler),
    Dynamic(DynamicHandler),
}

impl HandlerRef {
    pub fn action(controller: impl Into<String>, action: impl Into<String>) -> Self {
        HandlerRef::Static(StaticHandler::BoundMethod {
            controller: controller.into(),
            action: action.into(),
        })
    }

    pub fn function(name: impl Into<String>) -> Self {
        HandlerRef::Static(StaticHandler::Function(name.into()))
    }

    pub fn invokable(name: impl Into<String>) -> Self {
        HandlerRef::Static(StaticHandler::Invokable(name.into()))
    }

    /// Wraps a closure. Routes using it make the route set uncacheable.
    ///
    /// ```rust
    /// use perch::handler::HandlerRef;
    /// use perch::params::PathParams;
    /// use perch::types::Request;
    ///
    /// let handler = HandlerRef::dynamic(|_req: Request, params: PathParams| async move {
    ///     Ok::<_, anyhow::Error>(format!("user {}", params.get("id").unwrap_or("?")))
    /// });
    /// assert!(!handler.is_cacheable());
    /// ```
    pub fn dynamic<H: Handler>(handler: H) -> Self {
        HandlerRef::Dynamic(DynamicHandler(Arc::new(handler)))
    }

    pub fn is_cacheable(&self) -> bool {
        matches!(self, HandlerRef::Static(_))
    }

    pub fn as_static(&self) -> Option<&StaticHandler> {
        match self {
            HandlerRef::Static(s) => Some(s),
            HandlerRef::Dynamic(_) => None,
        }
    }
}

impl From<StaticHandler> for HandlerRef {
    fn from(handler: StaticHandler) -> Self {
        HandlerRef::Static(handler)
    }
}

impl From<(&str, &str)> for HandlerRef {
    fn from((controller, action): (&str, &str)) -> Self {
        HandlerRef::action(controller, action)
    }
}

impl From<BoxHandler> for HandlerRef {
    fn from(handler: BoxHandler) -> Self {
        HandlerRef::Dynamic(DynamicHandler(handler))
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;
    use crate::body::PerchBody;

    #[tokio::test]
    async fn closures_are_handlers() {
        let h = |_req: Request, params: PathParams| async move {
            Ok::<_, anyhow::Error>(format!("id={}", params.get("id").unwrap_or_default()))
        };

        let mut params = PathParams::default();
        params.push("id", "7");
        let res = h.call(Request::new(PerchBody::empty()), params).await.unwrap();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"id=7");
    }

    #[test]
    fn only_static_handlers_are_cacheable() {
        assert!(HandlerRef::action("UserController", "show").is_cacheable());
        assert!(HandlerRef::from(("UserController", "index")).is_cacheable());
        let dynamic = HandlerRef::dynamic(|_req: Request, _p: PathParams| async move {
            Ok::<_, anyhow::Error>("hi")
        });
        assert!(!dynamic.is_cacheable());
        assert!(dynamic.as_static().is_none());
    }

    #[test]
    fn static_handlers_serialize_as_tagged_data() {
        let h = StaticHandler::BoundMethod {
            controller: "UserController".into(),
            action: "show".into(),
        };
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"bound_method","target":{"controller":"UserController","action":"show"}}"#
        );
    }
}
