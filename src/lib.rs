//! httpserver - embeddable HTTP/1.1 server for microservices
//!
//! A single-binary HTTP/1.1 server built around a fixed worker pool, a
//! path-trie router, and cross-thread response handoff, for embedders who
//! want fine-grained control over routing and resource limits without
//! pulling in a full web framework.
//!
//! # Protocol Support
//!
//! - **HTTP/1.1**: persistent connections (keep-alive).
//! - **HTTP/1.0**: basic support for legacy clients.
//!
//! # Features
//!
//! ## 🔒 Security & Protection
//! - **Fully configurable limits and timeouts** for requests, responses, and connections.
//! - **Built-in overload protection** - automatic `503` responses when the
//!   pending-connection queue is full.
//!
//! ## 🚀 Performance
//! - **Pre-allocated per-connection buffers** reused for the lifetime of
//!   the process; a fixed worker pool rather than a task per connection.
//!
//! ## 🌐 Routing & State
//! - A longest-registered-prefix path router with no wildcard or
//!   path-parameter support.
//! - **Storing data between requests** - ability to store data between
//!   requests in a single connection using the [`ConnectionData`] trait.
//! - **Cross-thread response delivery** - a handler may hand its
//!   [`HttpResponseWriter`] to another task and call `send` from there.
//!
//! ## 🏭 Production Ready
//! - **Graceful performance degradation** - automatic 503 responses when overloaded.
//! - Automatic gzip compression for eligible responses.
//! - A lock-free statistics snapshot ([`StatisticsSnapshot`]).
//! - A built-in, options-configured log sink ([`init_log`]).
//!
//! # Quick Start
//!
//! ```no_run
//! use httpserver::{HttpResponse, HttpServer, ServerOptions, StatusCode};
//!
//! httpserver::impt_default_handler!{Hello}
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut server = HttpServer::<()>::new(ServerOptions::default()).unwrap();
//!     server.register_handler("/hello", Hello).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```
//!
//! For more examples, see the `demos/` binaries carried over from the
//! project this crate is adapted from.
//!
//! # Use Cases
//!
//! - **Internal APIs and microservices** needing explicit control over
//!   routing, timeouts, and resource limits.
//! - **Resource-constrained environments** - predictable, pre-allocated
//!   per-connection memory usage.
//! - **Legacy system integration** - HTTP/1.0 compatibility.
pub(crate) mod http {
    pub mod query;
    pub(crate) mod request;
    pub(crate) mod types;
}
pub mod limits;
pub(crate) mod error;
pub(crate) mod errors;
pub(crate) mod log;
pub(crate) mod options;
pub(crate) mod request;
pub(crate) mod response;
pub(crate) mod router;
pub(crate) mod stats;
pub(crate) mod writer;
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod server_impl;

    pub(crate) use server_impl::Handler;
}

pub use async_trait::async_trait;
pub use crate::{
    error::{ConfigError, ServerError, SocketError},
    http::{query, types::{Method, StatusCode, Version}},
    log::{
        get_log_level, init_log, set_log_level, AsyncModeOptions, FileModeOptions, LogLevel,
        LogOptions,
    },
    options::{CompressionLevel, ServerOptions},
    request::HttpRequest,
    response::HttpResponse,
    server::{connection::ConnectionData, server_impl::Handler, server_impl::HttpServer},
    stats::StatisticsSnapshot,
    writer::HttpResponseWriter,
};

#[doc(hidden)]
#[macro_export]
macro_rules! impt_default_handler {
    ($name:ident) => {
        use httpserver::{
            async_trait, Handler, HttpRequest, HttpResponse, HttpResponseWriter, StatusCode,
        };
        struct $name;

        // `<()>` to check functionality
        #[async_trait]
        impl Handler<()> for $name {
            async fn handle(&self, _: &mut (), _: HttpRequest, writer: HttpResponseWriter) {
                writer.send(HttpResponse::new(
                    StatusCode::Ok,
                    b"Hello world!".to_vec(),
                    "text/plain",
                ));
            }
        }
    };
}

#[doc(hidden)]
#[cfg(test)]
pub(crate) mod tools {
    use std::str::from_utf8;

    #[inline]
    pub(crate) fn str(value: Option<&[u8]>) -> Option<&str> {
        Some(from_utf8(value?).unwrap())
    }

    #[inline]
    pub(crate) fn str_op(value: &[u8]) -> &str {
        from_utf8(value).unwrap()
    }

    #[inline]
    pub(crate) fn str_2<'a>(value: (&'a [u8], &'a [u8])) -> (&'a str, &'a str) {
        (from_utf8(value.0).unwrap(), from_utf8(value.1).unwrap())
    }
}
