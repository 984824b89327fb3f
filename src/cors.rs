/// Cross-Origin Resource Sharing defaults applied by the dispatcher.
///
/// Every response leaving the dispatcher gets `Access-Control-Allow-Origin`,
/// `Access-Control-Allow-Headers` and `Access-Control-Allow-Methods`, unless a handler or
/// middleware already set them. Preflight responses advertise the methods the requested
/// path actually accepts.
///
/// # Example
/// ```rust
/// use perch::cors::CorsBuilder;
/// use perch::route::Method;
///
/// let cors = CorsBuilder::new()
///     .allow_origin("https://example.com")
///     .allow_methods(&[Method::Get, Method::Post])
///     .build();
/// ```
use http::{
    HeaderName, HeaderValue,
    header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        AUTHORIZATION, CONTENT_TYPE,
    },
};

use crate::{route::Method, types::Response};

/// CORS header values.
#[derive(Clone, Debug)]
pub struct CorsConfig {
    pub origin: String,
    pub headers: Vec<HeaderName>,
    pub methods: Vec<Method>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: "*".to_string(),
            headers: vec![CONTENT_TYPE, AUTHORIZATION],
            methods: Method::ALL.to_vec(),
        }
    }
}

pub struct CorsBuilder(CorsConfig);

impl Default for CorsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CorsBuilder {
    pub fn new() -> Self {
        Self(CorsConfig::default())
    }

    pub fn allow_origin(mut self, o: impl Into<String>) -> Self {
        self.0.origin = o.into();
        self
    }

    pub fn allow_methods(mut self, m: &[Method]) -> Self {
        self.0.methods = m.to_vec();
        self
    }

    pub fn allow_headers(mut self, h: &[HeaderName]) -> Self {
        self.0.headers = h.to_vec();
        self
    }

    pub fn build(self) -> CorsConfig {
        self.0
    }
}

/// Joins methods the way `Allow` and `Access-Control-Allow-Methods` expect them.
pub fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn header_value(value: &str) -> Option<HeaderValue> {
    match HeaderValue::from_str(value) {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::warn!(value, error = %err, "skipping invalid CORS header value");
            None
        }
    }
}

impl CorsConfig {
    /// Fills in the CORS headers the response does not carry yet.
    pub fn apply_defaults(&self, resp: &mut Response) {
        let headers = resp.headers_mut();

        if !headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN) {
            if let Some(v) = header_value(&self.origin) {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, v);
            }
        }

        if !headers.contains_key(ACCESS_CONTROL_ALLOW_HEADERS) && !self.headers.is_empty() {
            let joined = self
                .headers
                .iter()
                .map(|h| canonical_header(h.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            if let Some(v) = header_value(&joined) {
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, v);
            }
        }

        if !headers.contains_key(ACCESS_CONTROL_ALLOW_METHODS) && !self.methods.is_empty() {
            if let Some(v) = header_value(&join_methods(&self.methods)) {
                headers.insert(ACCESS_CONTROL_ALLOW_METHODS, v);
            }
        }
    }

    /// Sets the headers of a preflight answer for a path accepting `allowed`.
    pub fn apply_preflight(&self, resp: &mut Response, allowed: &[Method]) {
        if let Some(v) = header_value(&join_methods(allowed)) {
            resp.headers_mut().insert(ACCESS_CONTROL_ALLOW_METHODS, v);
        }
        self.apply_defaults(resp);
    }
}

/// `content-type` -> `Content-Type`, for readability of the advertised list.
fn canonical_header(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::PerchBody;

    #[test]
    fn defaults_fill_missing_headers() {
        let mut resp = Response::new(PerchBody::empty());
        CorsConfig::default().apply_defaults(&mut resp);

        let h = resp.headers();
        assert_eq!(h[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(h[ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type, Authorization");
        assert_eq!(
            h[ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, PATCH, DELETE, OPTIONS, HEAD"
        );
    }

    #[test]
    fn existing_headers_are_kept() {
        let mut resp = Response::new(PerchBody::empty());
        resp.headers_mut().insert(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://app.example"),
        );
        CorsConfig::default().apply_defaults(&mut resp);

        assert_eq!(
            resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example"
        );
        assert_eq!(
            resp.headers()
                .get_all(ACCESS_CONTROL_ALLOW_ORIGIN)
                .iter()
                .count(),
            1
        );
    }

    #[test]
    fn preflight_advertises_allowed_methods() {
        let mut resp = Response::new(PerchBody::empty());
        let cors = CorsBuilder::new().allow_origin("https://a.example").build();
        cors.apply_preflight(&mut resp, &[Method::Get, Method::Post, Method::Head]);

        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, HEAD");
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://a.example");
    }
}
