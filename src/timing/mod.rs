//! `Server-Timing` instrumentation.
//!
//! Mount [`timing`] on a router and every response carries a
//! [`Server-Timing`](https://www.w3.org/TR/server-timing/) header with a
//! `total` metric plus whatever the handlers record:
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use tsu_timing::{Request, Response, Router, Server};
//! use tsu_timing::timing::{self, TimingConfig, end_time, set_metric, start_time};
//!
//! async fn report(req: Request) -> Response {
//!     start_time(&req, "db", Some("Report query"));
//!     tokio::time::sleep(Duration::from_millis(20)).await;
//!     end_time(&req, "db", None);
//!
//!     set_metric(&req, "region", "eu-west-1", None);
//!     set_metric(&req, "custom", (23.8, "My custom Metric"), None);
//!     Response::text("ok")
//! }
//!
//! # async fn run() -> Result<(), tsu_timing::Error> {
//! let app = Router::new()
//!     .get("/report", report)
//!     .wrap(timing::timing(TimingConfig::default()));
//! Server::bind("0.0.0.0:3000").serve(app).await
//! # }
//! ```
//!
//! ```text
//! server-timing: db;dur=20.1;desc="Report query",region;desc="eu-west-1",
//!                custom;dur=23.8;desc="My custom Metric",total;dur=20.4;desc="Total Response Time"
//! ```
//!
//! The request-scoped functions never fail the request. Called on a route
//! without the middleware, or ending a timer that is not running, they log a
//! warning and do nothing.

mod config;
mod metric;
mod middleware;
mod registry;

use std::future::Future;

use tracing::warn;

use crate::error::TimingError;
use crate::request::Request;

pub use config::{CrossOrigin, DEFAULT_TOTAL_DESCRIPTION, Enabled, Exchange, TimingConfig};
pub use metric::{DEFAULT_PRECISION, MAX_PRECISION, Metric, MetricValue, header_value, parse_header};
pub use middleware::{SERVER_TIMING, TIMING_ALLOW_ORIGIN, TOTAL, Timing};
pub use registry::{Metrics, Registry};

/// Builds the timing middleware.
pub fn timing(config: TimingConfig) -> Timing {
    Timing::new(config)
}

/// Records a metric directly.
///
/// `value` is anything convertible into a [`MetricValue`]: a duration in
/// milliseconds (`f64`), a `(f64, description)` pair, a bare description, or
/// [`MetricValue::Empty`]. `precision` is the number of digits after the
/// point for durations, 1 by default.
pub fn set_metric(req: &Request, name: &str, value: impl Into<MetricValue>, precision: Option<usize>) {
    let value = value.into();
    with_registry(req, name, |reg| {
        reg.set_metric(name, value, precision);
        Ok(())
    });
}

/// Starts the timer `name`. Starting a running timer restarts it.
pub fn start_time(req: &Request, name: &str, description: Option<&str>) {
    with_registry(req, name, |reg| {
        reg.start(name, description);
        Ok(())
    });
}

/// Stops the timer `name` and records its duration.
pub fn end_time(req: &Request, name: &str, precision: Option<usize>) {
    with_registry(req, name, |reg| reg.end(name, precision));
}

/// Times `fut` under `name` and returns its output.
///
/// ```rust,ignore
/// let rows = time(&req, "db", Some("Load rows"), load_rows(&pool)).await;
/// ```
pub async fn time<F: Future>(req: &Request, name: &str, description: Option<&str>, fut: F) -> F::Output {
    let metrics = match Metrics::from_request(req) {
        Ok(metrics) => metrics,
        Err(e) => {
            warn!(error = %e, metric = name, "metric not recorded");
            return fut.await;
        }
    };

    metrics.with(|reg| reg.start(name, description));
    let output = fut.await;
    if let Err(e) = metrics.with(|reg| reg.end(name, None)) {
        warn!(error = %e, metric = name, "metric not recorded");
    }
    output
}

fn with_registry(
    req: &Request,
    name: &str,
    f: impl FnOnce(&mut Registry) -> Result<(), TimingError>,
) {
    let outcome = Metrics::from_request(req).and_then(|metrics| metrics.with(f));
    if let Err(e) = outcome {
        warn!(error = %e, metric = name, "metric not recorded");
    }
}
