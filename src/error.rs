//! Public error surface.
//!
//! Hand-rolled in the same style the teacher's own `errors::ErrorKind`
//! already uses (manual `Display` delegating to a formatted message,
//! manual `From<io::Error>`) rather than pulling in `thiserror`: the whole
//! rest of the crate's error surface already gets by without a derive
//! macro, and adding one here for just two small enums would be
//! stylistically inconsistent (`SPEC_FULL.md` §4.8).
//!
//! `ServerError`/`ConfigError`/`SocketError` are construction/`run`-time
//! errors that cross the public API. Per-session failures
//! (`SessionError` — read/write errors and timeouts, route misses,
//! unsupported methods, malformed URLs, handler panics) never cross this
//! boundary: a session handles its own errors internally, by responding or
//! closing, and only ever feeds an outcome into the statistics counters
//! (spec.md §7).

use std::{fmt, io};

/// Invalid [`crate::ServerOptions`] at construction, an invalid path passed
/// to `register_handler`, or a second call to [`crate::init_log`].
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Bind/listen/accept/close failure, wrapping the OS-level cause.
#[derive(Debug)]
pub struct SocketError {
    message: String,
    source: Option<io::Error>,
}

impl SocketError {
    pub(crate) fn new(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
        }
    }
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for SocketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Top-level error returned by [`crate::HttpServer::new`], `run`, and `stop`.
#[derive(Debug)]
pub enum ServerError {
    /// Invalid options, registration, or log initialization.
    Config(ConfigError),
    /// Bind/listen/accept/close failed.
    Socket(SocketError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Socket(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Socket(e) => Some(e),
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SocketError> for ServerError {
    fn from(e: SocketError) -> Self {
        Self::Socket(e)
    }
}

/// Per-session outcome. Never surfaces through the public API. A read/write
/// failure or timeout, a route miss, an unsupported method, or a malformed
/// URL is resolved inline in `server::connection` (a fixed `text/plain` 400
/// response, or closing the connection) and tallied directly into
/// [`crate::StatisticsSnapshot`]'s counters without ever being boxed up as
/// a `SessionError`; a handler panic is the one outcome that needs to cross
/// an `async fn` boundary as a `Result`, so it is the only variant here
/// (spec.md §7).
#[derive(Debug)]
pub(crate) enum SessionError {
    HandlerPanic,
}
