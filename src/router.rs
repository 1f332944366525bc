//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Router-wide middleware
//! wraps every matched route.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::error;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    stack: Arc<[BoxedMiddleware]>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), stack: Arc::new([]) }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use http::Method;
    /// # use tsu_timing::{Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Wraps every route in `middleware`. The first one registered runs
    /// outermost.
    pub fn wrap(mut self, middleware: impl Middleware) -> Self {
        let mut stack = self.stack.to_vec();
        stack.push(Arc::new(middleware));
        self.stack = stack.into();
        self
    }

    /// Routes one request through the middleware chain and its handler.
    ///
    /// Unmatched requests get `404` without running middleware. A chain that
    /// fails is logged and answered with `500`.
    pub async fn handle(&self, req: Request) -> Response {
        let Some((handler, params)) = self.lookup(req.method(), req.path()) else {
            return Response::status(StatusCode::NOT_FOUND);
        };

        let mut req = req;
        req.params = params;

        let method = req.method().clone();
        let path = req.path().to_owned();
        match Next::new(Arc::clone(&self.stack), handler).dispatch(req).await {
            Ok(response) => response,
            Err(e) => {
                error!(%method, %path, error = %e, "request failed");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
