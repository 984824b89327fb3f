//! Decodes JSON request bodies before they reach the handler.
//!
//! When the request declares a JSON media type (`application/json` or any `+json`
//! suffix such as `application/ld+json`) and carries a non-empty body, the body is parsed
//! and the resulting object or array is stored in the request extensions as
//! [`ParsedJson`]. The raw bytes stay available as the request body.
//!
//! Invalid JSON never reaches the handler: the middleware answers with
//! `400 Bad Request` and `{"error": "Invalid JSON payload: ..."}`.

use http::{StatusCode, header::CONTENT_TYPE};
use http_body_util::BodyExt;
use serde_json::{Value, json};

use crate::{
    body::PerchBody,
    middleware::{Middleware, Next},
    responder::{Json, Responder},
    types::{Request, Response},
};

/// The decoded body of a JSON request.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedJson(pub Value);

impl ParsedJson {
    pub fn from_request(req: &Request) -> Option<&Value> {
        req.extensions().get::<ParsedJson>().map(|p| &p.0)
    }
}

#[derive(Clone, Debug, Default)]
pub struct JsonBody {
    merge: bool,
}

impl JsonBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge decoded object keys into a `ParsedJson` object an earlier layer stored,
    /// instead of replacing it.
    pub fn merge(mut self) -> Self {
        self.merge = true;
        self
    }
}

fn is_json(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
        .is_some_and(|m| {
            m.type_() == mime::APPLICATION
                && (m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
        })
}

fn invalid_payload(err: &serde_json::Error) -> Response {
    let body = json!({ "error": format!("Invalid JSON payload: {err}") });
    let mut res = Json(body).into_response();
    *res.status_mut() = StatusCode::BAD_REQUEST;
    res
}

#[async_trait::async_trait]
impl Middleware for JsonBody {
    async fn process(&self, req: Request, next: Next) -> anyhow::Result<Response> {
        if !is_json(&req) {
            return next.run(req).await;
        }

        let (mut parts, body) = req.into_parts();
        let bytes = body
            .collect()
            .await
            .map_err(|e| anyhow::anyhow!(e))?
            .to_bytes();

        if !bytes.is_empty() {
            let data = match serde_json::from_slice::<Value>(&bytes) {
                Ok(data) => data,
                Err(err) => {
                    tracing::debug!(error = %err, "rejecting malformed JSON body");
                    return Ok(invalid_payload(&err));
                }
            };

            if data.is_object() || data.is_array() {
                let data = match (self.merge, parts.extensions.remove::<ParsedJson>(), data) {
                    (true, Some(ParsedJson(Value::Object(mut existing))), Value::Object(new)) => {
                        existing.extend(new);
                        Value::Object(existing)
                    }
                    (_, _, data) => data,
                };
                parts.extensions.insert(ParsedJson(data));
            }
        }

        next.run(Request::from_parts(parts, PerchBody::from(bytes)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        handler::BoxHandler,
        middleware::{BoxMiddleware, Pipeline},
        params::PathParams,
    };

    fn json_request(content_type: &str, body: &'static str) -> Request {
        let mut req = Request::new(PerchBody::from(body));
        req.headers_mut()
            .insert(CONTENT_TYPE, content_type.parse().unwrap());
        req
    }

    fn echo_parsed() -> BoxHandler {
        Arc::new(|req: Request, _params: PathParams| async move {
            let parsed = ParsedJson::from_request(&req).cloned().unwrap_or(Value::Null);
            Ok::<_, anyhow::Error>(Json(parsed))
        })
    }

    async fn run(mw: JsonBody, req: Request) -> (StatusCode, Value) {
        let pipeline: Pipeline = std::iter::once(Arc::new(mw) as BoxMiddleware).collect();
        let res = pipeline
            .run(req, echo_parsed(), PathParams::default())
            .await
            .unwrap();
        let status = res.status();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn decodes_json_media_types() {
        let (status, body) = run(
            JsonBody::new(),
            json_request("application/ld+json; charset=utf-8", r#"{"name":"ada"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "name": "ada" }));
    }

    #[tokio::test]
    async fn ignores_other_content_types() {
        let (_, body) = run(JsonBody::new(), json_request("text/plain", r#"{"a":1}"#)).await;
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn rejects_malformed_payloads() {
        let (status, body) = run(JsonBody::new(), json_request("application/json", "{oops")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid JSON payload")
        );
    }

    #[tokio::test]
    async fn merge_mode_keeps_existing_keys() {
        let mut req = json_request("application/json", r#"{"b":2}"#);
        req.extensions_mut().insert(ParsedJson(json!({ "a": 1 })));
        let (_, body) = run(JsonBody::new().merge(), req).await;
        assert_eq!(body, json!({ "a": 1, "b": 2 }));
    }
}
