//! Shared type aliases used across the dispatcher, pipeline and server.

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;

use crate::body::PerchBody;

pub type Request = http::Request<PerchBody>;
pub type Response = http::Response<PerchBody>;

pub type BoxBody = UnsyncBoxBody<Bytes, BoxError>;
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
