//! Response generation utilities and trait implementations for HTTP responses.
//!
//! Handlers return anything implementing [`Responder`]; the pipeline turns it into a
//! [`Response`] at the innermost link. The [`ResponseFactory`] trait is the seam the
//! dispatcher uses when it has to build a response of its own (preflight, 404, 500).
//!
//! # Examples
//!
//! ```rust
//! use perch::responder::Responder;
//! use http::StatusCode;
//!
//! let response = "Hello, World!".into_response();
//! let response = (StatusCode::CREATED, "stored").into_response();
//! let response = ().into_response();
//! ```

use std::{convert::Infallible, fmt::Display};

use bytes::Bytes;
use http::{
    StatusCode,
    header::{CONTENT_TYPE, HeaderValue},
};
use serde::Serialize;

use crate::{body::PerchBody, types::Response};

/// Trait for converting types into HTTP responses.
pub trait Responder {
    /// Converts the implementing type into an HTTP response.
    fn into_response(self) -> Response;
}

impl Responder for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl Responder for PerchBody {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl Responder for &'static str {
    fn into_response(self) -> Response {
        Response::new(PerchBody::from(Bytes::from_static(self.as_bytes())))
    }
}

impl Responder for String {
    fn into_response(self) -> Response {
        Response::new(PerchBody::from(self))
    }
}

impl Responder for () {
    fn into_response(self) -> Response {
        Response::new(PerchBody::empty())
    }
}

impl Responder for Infallible {
    fn into_response(self) -> Response {
        match self {}
    }
}

impl<R> Responder for (StatusCode, R)
where
    R: Display,
{
    fn into_response(self) -> Response {
        let (status, body) = self;
        let mut res = Response::new(PerchBody::from(body.to_string()));
        *res.status_mut() = status;
        res
    }
}

/// JSON response wrapper, serialized with `serde_json`.
///
/// A value that fails to serialize becomes a bare 500; handlers that need to report
/// the failure should serialize up front and return the error instead.
pub struct Json<T>(pub T);

impl<T> Responder for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(buf) => {
                let mut res = Response::new(PerchBody::from(buf));
                res.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                res
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize JSON response");
                let mut res = Response::new(PerchBody::empty());
                *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                res
            }
        }
    }
}

/// Builds the empty responses the dispatcher needs on its own.
pub trait ResponseFactory: Send + Sync + 'static {
    /// Creates a response with the given status, no headers and an empty body.
    fn create(&self, status: StatusCode) -> Response;
}

/// Stock [`ResponseFactory`] producing plain `http::Response` values.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultResponseFactory;

impl ResponseFactory for DefaultResponseFactory {
    fn create(&self, status: StatusCode) -> Response {
        let mut res = Response::new(PerchBody::empty());
        *res.status_mut() = status;
        res
    }
}
