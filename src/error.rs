//! Unified error types.

/// Boxed error returned by fallible handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by the framework's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures (binding a port, accepting a connection) and
/// handler failures that travel up the middleware chain untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("handler: {0}")]
    Handler(#[source] BoxError),
}

/// Misuse of the request-scoped timing API.
///
/// Never fatal. The request-scoped functions log these as warnings and carry
/// on; [`Registry`](crate::timing::Registry) methods return them directly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimingError {
    #[error("metrics not initialized, add the `timing()` middleware to this route")]
    NotInitialized,

    #[error("timer `{0}` does not exist")]
    UnknownTimer(String),
}
