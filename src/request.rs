//! The owned, handler-facing request value.
//!
//! `original_source`'s `HttpRequest` and the teacher's own zero-copy
//! `http::request::Request` both borrow from a connection's read buffer.
//! Spec.md requires the opposite here: a single, owned, movable value the
//! handler keeps for as long as it needs (potentially past the read
//! buffer's next reuse, and potentially on another thread via
//! [`crate::HttpResponseWriter`]). The session therefore parses with the
//! teacher's existing zero-copy scanner first (`http::request::Request`,
//! unchanged, see `SPEC_FULL.md` §4.3), then — once a request has fully,
//! successfully parsed — copies every field it needs out of that scanner's
//! buffer into this struct before the buffer is cleared and reused for the
//! next read. This is exactly the "Copy the body bytes... Collect path
//! segments... Collect query parameters..." step spec.md §4.3 step 5
//! describes.

use crate::Method;
use std::{collections::HashMap, time::Instant};

/// An owned, single-ownership HTTP request handed to a [`crate::Handler`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    session_id: u64,
    request_id: u64,
    body: Vec<u8>,
    segments: Vec<String>,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    start_time: Instant,
}

impl HttpRequest {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        method: Method,
        session_id: u64,
        request_id: u64,
        body: Vec<u8>,
        segments: Vec<String>,
        headers: HashMap<String, String>,
        query: HashMap<String, String>,
        start_time: Instant,
    ) -> Self {
        Self {
            method,
            session_id,
            request_id,
            body,
            segments,
            headers,
            query,
            start_time,
        }
    }

    /// The request's HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The id of the TCP session this request arrived on (strictly
    /// increasing for the life of the process, reset to 0 by `run`).
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// The id of this request within its session (monotonic, starts at 1).
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// The request body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Ordered path segments, as received (optionally percent-decoded, see
    /// [`crate::ServerOptions::auto_decode_url_parameters`]).
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All headers, name→value (last wins on duplicate).
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Looks up a query parameter by exact name.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|v| v.as_str())
    }

    /// All query parameters, name→value.
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// The monotonic-clock timestamp this request started at.
    pub fn start_time(&self) -> Instant {
        self.start_time
    }
}
