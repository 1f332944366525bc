//! One `Server-Timing` directive and its wire format.
//!
//! ```text
//! name
//! name;dur=<fixed-point>
//! name;desc="<text>"
//! name;dur=<fixed-point>;desc="<text>"
//! ```
//!
//! Directives are joined with `,` to form the header value. Descriptions are
//! written between double quotes as given; a `"` inside one produces a
//! malformed value.

use std::fmt;

/// Decimal digits rendered after the point when the caller passes none.
pub const DEFAULT_PRECISION: usize = 1;

/// Upper bound on rendered digits after the point.
pub const MAX_PRECISION: usize = 100;

/// What a metric records besides its name.
///
/// Conversions keep call sites short:
///
/// ```rust
/// use tsu_timing::timing::MetricValue;
///
/// let _: MetricValue = 23.8.into();                       // custom;dur=23.8
/// let _: MetricValue = (23.8, "My custom Metric").into(); // ...;desc="My custom Metric"
/// let _: MetricValue = "cache hit".into();                // cache;desc="cache hit"
/// let _: MetricValue = MetricValue::Empty;                // cache
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
    /// A duration in milliseconds, optionally described.
    Duration { ms: f64, description: Option<String> },
    /// No duration, only a description.
    Described(String),
    /// Bare name.
    Empty,
}

impl From<f64> for MetricValue {
    fn from(ms: f64) -> Self {
        Self::Duration { ms, description: None }
    }
}

impl From<(f64, &str)> for MetricValue {
    fn from((ms, description): (f64, &str)) -> Self {
        Self::Duration { ms, description: Some(description.to_owned()) }
    }
}

impl From<(f64, String)> for MetricValue {
    fn from((ms, description): (f64, String)) -> Self {
        Self::Duration { ms, description: Some(description) }
    }
}

impl From<&str> for MetricValue {
    fn from(description: &str) -> Self {
        Self::Described(description.to_owned())
    }
}

impl From<String> for MetricValue {
    fn from(description: String) -> Self {
        Self::Described(description)
    }
}

/// A recorded entry, rendered as one directive.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    name: String,
    duration: Option<f64>,
    description: Option<String>,
    precision: usize,
}

impl Metric {
    /// Builds an entry. A `precision` of `None` or `Some(0)` falls back to
    /// [`DEFAULT_PRECISION`]; larger values are capped at [`MAX_PRECISION`].
    /// An empty description is the same as none.
    pub fn new(name: impl Into<String>, value: MetricValue, precision: Option<usize>) -> Self {
        let precision = match precision {
            Some(p) if p > 0 => p.min(MAX_PRECISION),
            _ => DEFAULT_PRECISION,
        };
        let (duration, description) = match value {
            MetricValue::Duration { ms, description } => (Some(ms), description),
            MetricValue::Described(text) => (None, Some(text)),
            MetricValue::Empty => (None, None),
        };
        let description = description.filter(|d| !d.is_empty());
        Self { name: name.into(), duration, description, precision }
    }

    pub fn name(&self) -> &str { &self.name }

    /// Duration in milliseconds, unrounded.
    pub fn duration(&self) -> Option<f64> { self.duration }

    pub fn description(&self) -> Option<&str> { self.description.as_deref() }

    pub fn precision(&self) -> usize { self.precision }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(ms) = self.duration {
            write!(f, ";dur={:.*}", self.precision, ms)?;
        }
        if let Some(desc) = &self.description {
            write!(f, ";desc=\"{desc}\"")?;
        }
        Ok(())
    }
}

/// Joins entries into one header value, in order. `None` when there is
/// nothing to send.
pub fn header_value(entries: &[Metric]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    let value = entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    Some(value)
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parses a `Server-Timing` header value back into entries.
///
/// Accepts quoted or token `desc` values and optional whitespace around
/// separators. Unknown parameters are ignored, as are directives with an
/// empty name or a `dur` that is not a number. The precision of a parsed
/// entry is the number of digits written after the point.
pub fn parse_header(value: &str) -> Vec<Metric> {
    split_unquoted(value, ',')
        .into_iter()
        .filter_map(parse_directive)
        .collect()
}

fn parse_directive(raw: &str) -> Option<Metric> {
    let mut parts = split_unquoted(raw, ';').into_iter();
    let name = parts.next()?.trim();
    if name.is_empty() {
        return None;
    }

    let mut metric = Metric {
        name: name.to_owned(),
        duration: None,
        description: None,
        precision: 0,
    };

    for param in parts {
        let Some((key, val)) = param.split_once('=') else { continue };
        let val = val.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "dur" if metric.duration.is_none() => {
                let Ok(ms) = val.parse::<f64>() else { return None };
                metric.precision = val
                    .split_once('.')
                    .map_or(0, |(_, frac)| frac.len().min(MAX_PRECISION));
                metric.duration = Some(ms);
            }
            "desc" if metric.description.is_none() => {
                metric.description = Some(unquote(val));
            }
            _ => {}
        }
    }

    Some(metric)
}

/// Splits on `sep`, ignoring separators inside double quotes.
fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn unquote(val: &str) -> String {
    let Some(inner) = val.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return val.to_owned();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}
