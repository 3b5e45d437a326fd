//! Incoming request model.
//!
//! The core does not parse HTTP; transports build a [`Request`] from whatever
//! they receive (or convert an [`http::Request`]) and hand it to the
//! application. Methods and headers are the `http` crate's types.

use http::header::AsHeaderName;
use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// A request as seen by handlers.
#[derive(Debug, Clone, Default)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Request {
    /// Creates a request for `target`, splitting off any `?query` part.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        let mut path = target.into();
        let query = path.find('?').map(|at| {
            let query = path[at + 1..].to_string();
            path.truncate(at);
            query
        });
        Self {
            method,
            path,
            query,
            ..Default::default()
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    /// Appends a header (builder pattern).
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body (builder pattern).
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns the first value of header `name` if it is visible ASCII.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the headers, for transports and middleware.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The raw request body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl<B: Into<Vec<u8>>> From<http::Request<B>> for Request {
    fn from(request: http::Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{ACCEPT, CONTENT_TYPE};

    #[test]
    fn test_query_is_split_from_path() {
        let req = Request::get("/search?q=rust&page=2");
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query(), Some("q=rust&page=2"));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let req = Request::get("/").with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert_eq!(req.header("Content-Type"), Some("text/plain"));
        assert_eq!(req.header(&ACCEPT), None);
    }

    #[test]
    fn test_from_http_request() {
        let http_request = http::Request::builder()
            .method(Method::POST)
            .uri("/items?draft=1")
            .header(ACCEPT, "application/json")
            .body("payload")
            .unwrap();

        let req = Request::from(http_request);
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/items");
        assert_eq!(req.query(), Some("draft=1"));
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.body(), b"payload");
    }
}
