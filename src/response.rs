//! The owned, handler-built response value.
//!
//! Builder-style, in the fluent-setter idiom the teacher's own zero-copy
//! `http::response::Response` already uses (`.status(...)`, `.body(...)`),
//! generalized here to an owned `Vec<u8>` body and a `HashMap` of extra
//! headers so a handler can construct it freestanding and move it across a
//! [`crate::HttpResponseWriter`] to another thread.

use crate::{options::CompressionLevel, StatusCode};
use std::{collections::HashMap, io::Write};

/// An owned HTTP response, built by a handler and delivered through
/// [`crate::HttpResponseWriter::send`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    body: Vec<u8>,
    content_type: String,
    headers: HashMap<String, String>,
    force_gzip: bool,
    force_disable_keep_alive: bool,
    compression_level: CompressionLevel,
}

impl HttpResponse {
    /// Builds a response with the given status, body, and content type.
    pub fn new(status: StatusCode, body: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            status,
            body,
            content_type: content_type.into(),
            headers: HashMap::new(),
            force_gzip: false,
            force_disable_keep_alive: false,
            compression_level: CompressionLevel::Default,
        }
    }

    /// Adds (or overwrites) an extra response header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Forces gzip compression regardless of body size or `Accept-Encoding`.
    pub fn force_gzip(mut self, force: bool) -> Self {
        self.force_gzip = force;
        self
    }

    /// Forces the connection to close after this response, regardless of
    /// the request's keep-alive semantics.
    pub fn force_disable_keep_alive(mut self, force: bool) -> Self {
        self.force_disable_keep_alive = force;
        self
    }

    /// Sets the gzip compression level used when compression is triggered.
    pub fn compression_level(mut self, level: CompressionLevel) -> Self {
        self.compression_level = level;
        self
    }

    pub(crate) fn status(&self) -> StatusCode {
        self.status
    }

    pub(crate) fn body(&self) -> &[u8] {
        &self.body
    }

    pub(crate) fn content_type(&self) -> &str {
        &self.content_type
    }

    pub(crate) fn extra_headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub(crate) fn wants_force_gzip(&self) -> bool {
        self.force_gzip
    }

    pub(crate) fn wants_force_disable_keep_alive(&self) -> bool {
        self.force_disable_keep_alive
    }

    /// Gzip-compresses `self.body` in place at the configured compression
    /// level. Used by the session when gzip is triggered (§4.3 step 7).
    pub(crate) fn compress_body(&mut self) -> std::io::Result<()> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), self.compression_level.to_flate2());
        encoder.write_all(&self.body)?;
        self.body = encoder.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_setters_compose() {
        let response = HttpResponse::new(StatusCode::Ok, b"hi".to_vec(), "text/plain")
            .header("x-request-id", "42")
            .force_gzip(true)
            .force_disable_keep_alive(true)
            .compression_level(CompressionLevel::BestCompression);

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body(), b"hi");
        assert_eq!(response.content_type(), "text/plain");
        assert_eq!(response.extra_headers().get("x-request-id").unwrap(), "42");
        assert!(response.wants_force_gzip());
        assert!(response.wants_force_disable_keep_alive());
    }

    #[test]
    fn compress_body_round_trips_through_gzip() {
        let mut response = HttpResponse::new(StatusCode::Ok, vec![b'A'; 600], "text/plain");
        response.compress_body().unwrap();
        assert_ne!(response.body().len(), 600);

        let mut decoder = flate2::read::GzDecoder::new(response.body());
        let mut out = Vec::new();
        std::io::Read::read_to_end(&mut decoder, &mut out).unwrap();
        assert_eq!(out, vec![b'A'; 600]);
    }
}
