//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

/// An incoming HTTP request with its body fully collected.
///
/// Besides the usual accessors, every request carries a typed, request-scoped
/// store ([`get`](Request::get) / [`set`](Request::set)). Middleware uses it to
/// hand state to downstream handlers; at most one value per type.
pub struct Request {
    pub(crate) inner: http::Request<Bytes>,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(inner: http::Request<Bytes>, params: HashMap<String, String>) -> Self {
        Self { inner, params }
    }

    pub fn method(&self) -> &Method { self.inner.method() }
    pub fn uri(&self) -> &Uri { self.inner.uri() }
    pub fn path(&self) -> &str { self.inner.uri().path() }
    pub fn headers(&self) -> &HeaderMap { self.inner.headers() }
    pub fn body(&self) -> &[u8] { self.inner.body() }

    /// Case-insensitive header lookup. Non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Reads the request-scoped value of type `T`, if one was set.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.inner.extensions().get::<T>()
    }

    /// Stores a request-scoped value, replacing any previous value of the
    /// same type.
    pub fn set<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        self.inner.extensions_mut().insert(value);
    }
}

/// Wraps an already-collected `http` request. No path params are set; the
/// router fills them in when it dispatches.
impl From<http::Request<Bytes>> for Request {
    fn from(inner: http::Request<Bytes>) -> Self {
        Self::new(inner, HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        http::Request::builder()
            .method(Method::POST)
            .uri("/users?page=2")
            .header("X-Trace", "abc")
            .body(Bytes::from_static(b"{}"))
            .unwrap()
            .into()
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = request();
        assert_eq!(req.header("x-trace"), Some("abc"));
        assert_eq!(req.header("X-TRACE"), Some("abc"));
        assert_eq!(req.header("missing"), None);
    }

    #[test]
    fn exposes_method_path_and_body() {
        let req = request();
        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.path(), "/users");
        assert_eq!(req.body(), b"{}");
    }

    #[test]
    fn set_replaces_value_of_same_type() {
        let mut req = request();
        assert!(req.get::<u32>().is_none());
        req.set(1u32);
        req.set(2u32);
        assert_eq!(req.get::<u32>(), Some(&2));
    }
}
