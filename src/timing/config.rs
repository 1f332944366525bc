//! Timing middleware configuration.

use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, Method, StatusCode, Uri};

use crate::request::Request;
use crate::response::Response;

/// Description of the automatic `total` metric unless overridden.
pub const DEFAULT_TOTAL_DESCRIPTION: &str = "Total Response Time";

/// Options for [`timing`](super::timing).
///
/// ```rust
/// use http::Method;
/// use tsu_timing::timing::{Enabled, TimingConfig};
///
/// let config = TimingConfig::default()
///     .total_description("Whole request")
///     .enabled(Enabled::when(|x| x.method() == Method::GET));
/// ```
#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub(crate) total: bool,
    pub(crate) enabled: Enabled,
    pub(crate) total_description: String,
    pub(crate) auto_end: bool,
    pub(crate) cross_origin: CrossOrigin,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            total: true,
            enabled: Enabled::Always,
            total_description: DEFAULT_TOTAL_DESCRIPTION.to_owned(),
            auto_end: true,
            cross_origin: CrossOrigin::Disabled,
        }
    }
}

impl TimingConfig {
    /// Record a `total` metric spanning the whole downstream chain.
    pub fn total(mut self, total: bool) -> Self {
        self.total = total;
        self
    }

    /// Gate header emission. Accepts a `bool` or an [`Enabled`].
    pub fn enabled(mut self, enabled: impl Into<Enabled>) -> Self {
        self.enabled = enabled.into();
        self
    }

    pub fn total_description(mut self, description: impl Into<String>) -> Self {
        self.total_description = description.into();
        self
    }

    /// Close timers the handlers left running before the header is built.
    pub fn auto_end(mut self, auto_end: bool) -> Self {
        self.auto_end = auto_end;
        self
    }

    /// Send `Timing-Allow-Origin` alongside the header. Accepts a `bool`
    /// (`true` means `*`), an origin string, or a [`CrossOrigin`].
    pub fn cross_origin(mut self, cross_origin: impl Into<CrossOrigin>) -> Self {
        self.cross_origin = cross_origin.into();
        self
    }

    /// Whether finalization needs a snapshot of the request head.
    pub(crate) fn inspects_exchange(&self) -> bool {
        matches!(self.enabled, Enabled::Predicate(_))
            || matches!(self.cross_origin, CrossOrigin::Predicate(_))
    }
}

// ── Exchange ──────────────────────────────────────────────────────────────────

/// The request head as it arrived, kept for predicates that run after the
/// handler consumed the request.
#[derive(Clone, Debug)]
pub(crate) struct RequestHead {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl RequestHead {
    pub(crate) fn capture(req: &Request) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            headers: req.headers().clone(),
        }
    }
}

/// A finished request/response pair, handed to configuration predicates.
pub struct Exchange<'a> {
    pub(crate) head: &'a RequestHead,
    pub(crate) response: &'a Response,
}

impl Exchange<'_> {
    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn request_headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn status(&self) -> StatusCode { self.response.status_code() }
    pub fn response(&self) -> &Response { self.response }
}

// ── Enabled ───────────────────────────────────────────────────────────────────

type PredicateFn<T> = Arc<dyn Fn(&Exchange<'_>) -> T + Send + Sync>;

/// Whether the `Server-Timing` header is emitted. Evaluated once per request,
/// after every timer has been closed.
#[derive(Clone)]
pub enum Enabled {
    Always,
    Never,
    Predicate(PredicateFn<bool>),
}

impl Enabled {
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&Exchange<'_>) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    pub(crate) fn evaluate(&self, exchange: Option<&Exchange<'_>>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Predicate(f) => exchange.is_some_and(|x| f(x)),
        }
    }
}

impl From<bool> for Enabled {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Always } else { Self::Never }
    }
}

impl fmt::Debug for Enabled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Never => f.write_str("Never"),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

// ── CrossOrigin ───────────────────────────────────────────────────────────────

/// Value of the `Timing-Allow-Origin` header sent with the timings.
#[derive(Clone, Default)]
pub enum CrossOrigin {
    #[default]
    Disabled,
    /// `Timing-Allow-Origin: *`
    Any,
    Origin(String),
    /// Decides per request; `None` sends nothing.
    Predicate(PredicateFn<Option<String>>),
}

impl CrossOrigin {
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&Exchange<'_>) -> Option<String> + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    pub(crate) fn evaluate(&self, exchange: Option<&Exchange<'_>>) -> Option<String> {
        match self {
            Self::Disabled => None,
            Self::Any => Some("*".to_owned()),
            Self::Origin(origin) => Some(origin.clone()),
            Self::Predicate(f) => exchange.and_then(|x| f(x)),
        }
    }
}

impl From<bool> for CrossOrigin {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Any } else { Self::Disabled }
    }
}

impl From<&str> for CrossOrigin {
    fn from(origin: &str) -> Self {
        Self::Origin(origin.to_owned())
    }
}

impl From<String> for CrossOrigin {
    fn from(origin: String) -> Self {
        Self::Origin(origin)
    }
}

impl fmt::Debug for CrossOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Any => f.write_str("Any"),
            Self::Origin(origin) => f.debug_tuple("Origin").field(origin).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
