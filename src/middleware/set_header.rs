//! Sets a fixed header on every response passing back through the layer.
//!
//! The header is written after the inner layers and the handler ran, replacing any
//! value they set under the same name.

use http::{HeaderName, HeaderValue};

use crate::{
    middleware::{Middleware, Next},
    types::{Request, Response},
};

#[derive(Clone, Debug)]
pub struct SetHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl SetHeader {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    pub fn from_static(name: &'static str, value: &'static str) -> Self {
        Self::new(HeaderName::from_static(name), HeaderValue::from_static(value))
    }
}

#[async_trait::async_trait]
impl Middleware for SetHeader {
    async fn process(&self, req: Request, next: Next) -> anyhow::Result<Response> {
        let mut res = next.run(req).await?;
        res.headers_mut().insert(self.name.clone(), self.value.clone());
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        body::PerchBody,
        handler::BoxHandler,
        middleware::{BoxMiddleware, Pipeline},
        params::PathParams,
    };

    #[tokio::test]
    async fn replaces_header_set_by_the_handler() {
        let handler: BoxHandler = Arc::new(|_req: Request, _params: PathParams| async move {
            let mut res = Response::new(PerchBody::empty());
            res.headers_mut()
                .insert("x-example-middleware", HeaderValue::from_static("pending"));
            Ok::<_, anyhow::Error>(res)
        });
        let pipeline: Pipeline = std::iter::once(
            Arc::new(SetHeader::from_static("x-example-middleware", "executed")) as BoxMiddleware,
        )
        .collect();

        let res = pipeline
            .run(Request::new(PerchBody::empty()), handler, PathParams::default())
            .await
            .unwrap();

        let values: Vec<_> = res.headers().get_all("x-example-middleware").iter().collect();
        assert_eq!(values, ["executed"]);
    }
}
