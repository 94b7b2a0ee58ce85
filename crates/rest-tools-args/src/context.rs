//! Request context the argument handler reads from.
//!
//! Argument parsing only ever looks at the query string and the body, so
//! that is all a [`RequestContext`] keeps.

use bytes::Bytes;
use http::Uri;

/// The query string and body of an incoming request.
///
/// # Example
///
/// ```rust
/// use rest_tools_args::RequestContext;
/// use http::Uri;
/// use bytes::Bytes;
///
/// let ctx = RequestContext::new(Uri::from_static("/all?foo=1"), Bytes::new());
/// assert_eq!(ctx.query_string(), Some("foo=1"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    uri: Uri,
    body: Bytes,
}

impl RequestContext {
    /// Creates a context from a request URI and body.
    #[must_use]
    pub fn new(uri: Uri, body: Bytes) -> Self {
        Self { uri, body }
    }

    /// Returns a builder, mostly useful in tests.
    #[must_use]
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    /// Request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Raw query string, without the `?`.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl From<http::Request<Bytes>> for RequestContext {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts.uri, body)
    }
}

/// Builds a [`RequestContext`] without a full `http::Request`.
#[derive(Debug, Default)]
pub struct RequestContextBuilder {
    uri: Option<Uri>,
    body: Bytes,
}

impl RequestContextBuilder {
    /// Sets the URI. Defaults to `/`.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Sets the body. Defaults to empty.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> RequestContext {
        RequestContext {
            uri: self.uri.unwrap_or_else(|| Uri::from_static("/")),
            body: self.body,
        }
    }
}
