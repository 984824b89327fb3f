//! Error responses produced by the dispatcher itself.
//!
//! A configured [`ErrorRenderer`] (a template engine, typically) gets the first chance
//! to render a status. Without one, without a template for the status, or when
//! rendering fails, the page is plain text: the status line, a blank line, and the
//! message.

use http::{HeaderValue, StatusCode, header::CONTENT_TYPE};

use crate::{body::PerchBody, responder::ResponseFactory, types::Response};

pub const NOT_FOUND_MESSAGE: &str = "Page not found";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// What an error template gets to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
    pub debug: bool,
    /// The failure description, only present in debug mode.
    pub detail: Option<String>,
}

impl ErrorPage {
    pub fn not_found(debug: bool) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: NOT_FOUND_MESSAGE.to_string(),
            debug,
            detail: None,
        }
    }

    /// A 500 page. The failure text only becomes the message in debug mode.
    pub fn internal(err: &anyhow::Error, debug: bool) -> Self {
        let (message, detail) = if debug {
            (err.to_string(), Some(format!("{err:?}")))
        } else {
            (INTERNAL_ERROR_MESSAGE.to_string(), None)
        };

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
            debug,
            detail,
        }
    }
}

/// Template collaborator for error pages.
pub trait ErrorRenderer: Send + Sync + 'static {
    /// Whether a template exists for `status`.
    fn has_template(&self, status: StatusCode) -> bool;

    fn render(&self, page: &ErrorPage) -> anyhow::Result<Response>;
}

/// Renders `page`, through `renderer` when it can, as plain text otherwise.
pub fn render_error(
    page: &ErrorPage,
    renderer: Option<&dyn ErrorRenderer>,
    factory: &dyn ResponseFactory,
) -> Response {
    if let Some(renderer) = renderer.filter(|r| r.has_template(page.status)) {
        match renderer.render(page) {
            Ok(mut res) => {
                *res.status_mut() = page.status;
                return res;
            }
            Err(err) => {
                tracing::warn!(
                    status = %page.status,
                    error = %err,
                    "error template failed, falling back to plain text"
                );
            }
        }
    }

    let mut res = factory.create(page.status);
    *res.body_mut() = PerchBody::from(format!("{}\n\n{}", page.status, page.message));
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res
}
