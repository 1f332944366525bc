//! # tsu-timing
//!
//! [`Server-Timing`](https://www.w3.org/TR/server-timing/) instrumentation for
//! a minimal HTTP framework.
//!
//! Wrap a router in [`timing()`] and every response reports how long the
//! server spent on it, plus any metric a handler records along the way.
//! Browsers show the values in the network panel; nothing leaves the request.
//!
//! - Named timers with [`start_time`] / [`end_time`], or [`timing::time`]
//!   around a future
//! - Direct metrics with [`set_metric`]: a duration, a description, or both
//! - An automatic `total` metric and auto-closing of forgotten timers
//! - Emission gated by a flag or a predicate over the finished exchange
//!
//! The host side is deliberately small: radix-tree routing via [`matchit`],
//! hyper for HTTP/1.1 and HTTP/2, router-wide middleware, graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsu_timing::{Request, Response, Router, Server, TimingConfig};
//! use tsu_timing::{end_time, set_metric, start_time, timing};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .get("/users/{id}", get_user)
//!         .wrap(timing(TimingConfig::default()));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     start_time(&req, "db", Some("User lookup"));
//!     let id = req.param("id").unwrap_or("unknown").to_owned();
//!     end_time(&req, "db", None);
//!
//!     set_metric(&req, "cache", "miss", None);
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod timing;

pub use error::{BoxError, Error, TimingError};
pub use handler::Handler;
pub use request::Request;
pub use response::{ContentType, IntoOutcome, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use timing::{Timing, TimingConfig, end_time, set_metric, start_time, timing};
