//! The middleware that owns a request's registry and writes the header.

use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

use super::config::{Exchange, RequestHead, TimingConfig};
use super::registry::Metrics;

pub const SERVER_TIMING: HeaderName = HeaderName::from_static("server-timing");
pub const TIMING_ALLOW_ORIGIN: HeaderName = HeaderName::from_static("timing-allow-origin");

/// Name of the timer spanning the downstream chain.
pub const TOTAL: &str = "total";

/// Server-Timing middleware. Build it with [`timing`](super::timing).
#[derive(Clone, Debug)]
pub struct Timing {
    config: Arc<TimingConfig>,
}

impl Timing {
    pub fn new(config: TimingConfig) -> Self {
        Self { config: Arc::new(config) }
    }
}

impl Middleware for Timing {
    fn call(&self, mut req: Request, next: Next) -> BoxFuture {
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let metrics = Metrics::new();
            req.set(metrics.clone());

            if config.total {
                metrics.with(|reg| reg.start(TOTAL, Some(config.total_description.as_str())));
            }

            let head = config.inspects_exchange().then(|| RequestHead::capture(&req));

            // An error skips everything below: no header for failed requests.
            let mut response = next.run(req).await?;

            let value = metrics.with(|reg| {
                if config.total {
                    if let Err(e) = reg.end(TOTAL, None) {
                        warn!(error = %e, "total timer was ended downstream");
                    }
                }
                if config.auto_end {
                    reg.end_all();
                }
                reg.header_value()
            });

            let exchange = head.as_ref().map(|head| Exchange { head, response: &response });
            let enabled = config.enabled.evaluate(exchange.as_ref());
            let allow_origin = config.cross_origin.evaluate(exchange.as_ref());

            let Some(value) = value.filter(|_| enabled) else {
                return Ok(response);
            };

            match HeaderValue::try_from(value) {
                Ok(value) => {
                    debug!(server_timing = ?value, "appending Server-Timing");
                    response.append_header(SERVER_TIMING, value);
                }
                Err(e) => {
                    warn!(error = %e, "Server-Timing value is not a valid header, skipping");
                    return Ok(response);
                }
            }

            if let Some(origin) = allow_origin {
                match HeaderValue::try_from(origin) {
                    Ok(origin) => {
                        response.headers_mut().insert(TIMING_ALLOW_ORIGIN, origin);
                    }
                    Err(e) => warn!(error = %e, "invalid Timing-Allow-Origin value, skipping"),
                }
            }

            Ok(response)
        })
    }
}
