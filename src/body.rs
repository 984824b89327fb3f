//! This module provides the `PerchBody` struct, a wrapper around a boxed HTTP body.
//! Requests coming off the wire and responses built by handlers both carry it, so
//! the dispatcher can swap a body out (HEAD requests) without caring where it came from.
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;

use http_body::{Body, Frame, SizeHint};
use http_body_util::{BodyExt, Empty, Full};

use crate::types::{BoxBody, BoxError};

/// The `PerchBody` struct is a wrapper around a boxed HTTP body (`BoxBody`).
///
/// # Example
///
/// ```rust
/// use perch::body::PerchBody;
///
/// let empty_body = PerchBody::empty();
/// let string_body = PerchBody::from("Hello, world!".to_string());
/// ```
pub struct PerchBody(BoxBody);

impl PerchBody {
    /// Creates a new `PerchBody` from any body yielding `Bytes`.
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self(body.map_err(|e| e.into()).boxed_unsync())
    }

    /// Creates an empty `PerchBody`.
    pub fn empty() -> Self {
        Self::new(Empty::new())
    }
}

impl Default for PerchBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for PerchBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerchBody")
            .field("size_hint", &self.0.size_hint())
            .finish()
    }
}

impl From<()> for PerchBody {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

macro_rules! body_from_impl {
    ($ty:ty) => {
        impl From<$ty> for PerchBody {
            fn from(buf: $ty) -> Self {
                Self::new(Full::from(buf))
            }
        }
    };
}

body_from_impl!(String);
body_from_impl!(&'static str);
body_from_impl!(Bytes);
body_from_impl!(Vec<u8>);

impl Body for PerchBody {
    type Data = Bytes;
    type Error = BoxError;

    #[inline]
    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.0).poll_frame(cx)
    }

    #[inline]
    fn size_hint(&self) -> SizeHint {
        self.0.size_hint()
    }

    #[inline]
    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }
}
