//! Per-request metric registry.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::error::TimingError;
use crate::request::Request;

use super::metric::{self, Metric, MetricValue};

/// A running named timer.
#[derive(Clone, Debug)]
struct Timer {
    description: Option<String>,
    start: Instant,
}

/// Recorded entries plus the timers still running for one request.
///
/// Entries keep insertion order. Timers are keyed by name and kept in the
/// order they were first started; restarting a running timer replaces its
/// start instant in place.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<Metric>,
    timers: Vec<(String, Timer)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry. Never touches the running timers.
    pub fn set_metric(&mut self, name: &str, value: MetricValue, precision: Option<usize>) {
        self.entries.push(Metric::new(name, value, precision));
    }

    /// Starts (or restarts) the timer `name`.
    pub fn start(&mut self, name: &str, description: Option<&str>) {
        self.start_at(name, description, Instant::now());
    }

    /// Stops the timer `name` and records its elapsed milliseconds.
    pub fn end(&mut self, name: &str, precision: Option<usize>) -> Result<(), TimingError> {
        self.end_at(name, precision, Instant::now())
    }

    /// Stops every running timer, oldest first.
    pub fn end_all(&mut self) {
        for (name, timer) in std::mem::take(&mut self.timers) {
            self.record(&name, timer, None, Instant::now());
        }
    }

    pub fn entries(&self) -> &[Metric] {
        &self.entries
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.timers.iter().any(|(n, _)| n == name)
    }

    /// The `Server-Timing` value for everything recorded so far.
    pub fn header_value(&self) -> Option<String> {
        metric::header_value(&self.entries)
    }

    pub(crate) fn start_at(&mut self, name: &str, description: Option<&str>, start: Instant) {
        let timer = Timer { description: description.map(str::to_owned), start };
        match self.timers.iter_mut().find(|(n, _)| n == name) {
            Some((_, running)) => *running = timer,
            None => self.timers.push((name.to_owned(), timer)),
        }
    }

    pub(crate) fn end_at(
        &mut self,
        name: &str,
        precision: Option<usize>,
        now: Instant,
    ) -> Result<(), TimingError> {
        let idx = self.timers.iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| TimingError::UnknownTimer(name.to_owned()))?;
        let (name, timer) = self.timers.remove(idx);
        self.record(&name, timer, precision, now);
        Ok(())
    }

    fn record(&mut self, name: &str, timer: Timer, precision: Option<usize>, now: Instant) {
        let ms = now.saturating_duration_since(timer.start).as_secs_f64() * 1000.0;
        let value = MetricValue::Duration { ms, description: timer.description };
        self.set_metric(name, value, precision);
    }
}

// ── Request-scoped handle ─────────────────────────────────────────────────────

/// Shared handle to the registry of one request.
///
/// The timing middleware puts one in the request's store and keeps a clone so
/// it can finish the header after the handler consumed the request. Only that
/// request's own chain ever touches it; the lock is held for one registry
/// call at a time and never across an `.await`.
#[derive(Clone, Debug, Default)]
pub struct Metrics(Arc<Mutex<Registry>>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// The handle installed on `req` by the timing middleware.
    pub fn from_request(req: &Request) -> Result<Self, TimingError> {
        req.get::<Metrics>().cloned().ok_or(TimingError::NotInitialized)
    }

    /// Runs `f` against the registry.
    pub fn with<T>(&self, f: impl FnOnce(&mut Registry) -> T) -> T {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // Poison is ignored: recorded entries stay valid.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
