//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: timing, request-id injection, header inspection.
//! Register it router-wide with [`Router::wrap`](crate::Router::wrap); the
//! first registered runs outermost.
//!
//! Any `async fn(Request, Next) -> Result<Response, Error>` is a middleware:
//!
//! ```rust,no_run
//! use tsu_timing::{Error, Request, Response, Router};
//! use tsu_timing::middleware::Next;
//!
//! async fn request_id(req: Request, next: Next) -> Result<Response, Error> {
//!     let mut res = next.run(req).await?;
//!     res.headers_mut().insert("x-request-id", "42".parse().unwrap());
//!     Ok(res)
//! }
//!
//! # async fn hello(_: Request) -> &'static str { "hi" }
//! let app = Router::new().get("/", hello).wrap(request_id);
//! ```
//!
//! Returning `Err` (or propagating one with `?`) skips the rest of the
//! caller's post-processing; the server turns it into a `500`.

use std::future::Future;
use std::sync::Arc;

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::response::Response;

pub use crate::handler::BoxFuture;

/// A request interceptor. See the [module docs](self).
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin((self)(req, next))
    }
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The rest of the chain: remaining middleware, then the route handler.
pub struct Next {
    stack: Arc<[BoxedMiddleware]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(stack: Arc<[BoxedMiddleware]>, endpoint: BoxedHandler) -> Self {
        Self { stack, index: 0, endpoint }
    }

    /// Runs the remaining chain and waits for its outcome.
    pub async fn run(self, req: Request) -> Result<Response, Error> {
        self.dispatch(req).await
    }

    pub(crate) fn dispatch(mut self, req: Request) -> BoxFuture {
        match self.stack.get(self.index).cloned() {
            Some(middleware) => {
                self.index += 1;
                middleware.call(req, self)
            }
            None => self.endpoint.call(req),
        }
    }
}
