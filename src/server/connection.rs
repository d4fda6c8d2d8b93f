//! The per-connection session state machine (component C6).
//!
//! Grounded on the teacher's own `HttpConnection`: a single, reusable
//! per-worker struct driving a read → parse → dispatch → write →
//! (keep-alive | close) loop over one `TcpStream`, with independent read
//! and write deadlines (`tokio::select! { biased; ... }`, unchanged from the
//! teacher). What changes is everything downstream of a successful parse:
//! routing replaces a single fixed `Handler`, the handler now receives an
//! owned [`crate::HttpRequest`] and a [`HttpResponseWriter`] instead of
//! borrowed `&Request`/`&mut Response`, and gzip/keep-alive/header assembly
//! happens here against the handler's returned [`HttpResponse`]
//! (`SPEC_FULL.md` §4.3).

use crate::{
    error::SessionError,
    errors::ErrorKind,
    http::request::{Parser, Request},
    limits::{ConnLimits, ReqLimits, RespLimits, ServerLimits},
    log::{self, LogLevel},
    options::ServerOptions,
    request::HttpRequest,
    response::HttpResponse,
    router::Router,
    server::Handler,
    stats::HttpStatistics,
    writer::HttpResponseWriter,
    Method, StatusCode, Version,
};
use std::{
    future::Future,
    io,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    task::Poll,
    time::Instant,
};
use tokio::{io::AsyncWriteExt, net::TcpStream, time::sleep};

/// Bundle of the teacher's existing limit structs a session needs; plays
/// the role the old `AllLimits` tuple played in `server_impl.rs`.
pub(crate) type SessionLimits = (ServerLimits, ConnLimits, ReqLimits, RespLimits);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(0);

/// Resets the process-wide session id counter to zero. Called once by
/// [`crate::HttpServer::run`] before spawning workers, so ids are stable
/// and restart-reproducible across runs within the same process.
pub(crate) fn reset_session_counter() {
    NEXT_SESSION_ID.store(0, Ordering::Relaxed);
}

fn next_session_id() -> u64 {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Negotiated wire state shared between the zero-copy parser (which sets
/// it while reading the request line, see `http/request.rs`) and the
/// response writer (which reads it when deciding `Connection: keep-alive`).
///
/// Stands in for the teacher's old builder-style `Response` (since
/// removed), which this redesign no longer threads through the parse
/// methods: those methods only ever used `Response` for its negotiated
/// `version`/`keep_alive` fields, never its buffer, so this narrower
/// struct keeps `http/request.rs`'s parsing code unchanged while dropping
/// the unused
/// builder machinery from the hot path.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WireState {
    pub(crate) version: Version,
    pub(crate) keep_alive: bool,
}

impl WireState {
    fn new() -> Self {
        Self {
            version: Version::Http11,
            keep_alive: true,
        }
    }
}

pub(crate) struct HttpConnection<S: ConnectionData> {
    connection_data: S,
    connection: Connection,
    pub(crate) parser: Parser,
    pub(crate) request: Request,
    pub(crate) response: WireState,

    router: Arc<Router<S>>,
    options: Arc<ServerOptions>,
    stats: Arc<HttpStatistics>,

    pub(crate) server_limits: ServerLimits,
    pub(crate) conn_limits: ConnLimits,
    pub(crate) req_limits: ReqLimits,
    pub(crate) resp_limits: RespLimits,

    wire_buffer: Vec<u8>,
    session_id: u64,
}

impl<S: ConnectionData> HttpConnection<S> {
    #[inline]
    pub(crate) fn new(
        router: Arc<Router<S>>,
        options: Arc<ServerOptions>,
        stats: Arc<HttpStatistics>,
        limits: SessionLimits,
    ) -> Self {
        let (server_limits, conn_limits, req_limits, resp_limits) = limits;

        Self {
            connection_data: S::new(),
            connection: Connection::new(),
            parser: Parser::new(&req_limits),
            request: Request::new(&req_limits),
            response: WireState::new(),

            router,
            options,
            stats,

            wire_buffer: Vec::with_capacity(resp_limits.default_capacity),

            server_limits,
            conn_limits,
            req_limits,
            resp_limits,
            session_id: 0,
        }
    }

    #[inline]
    fn reset_request_response(&mut self) {
        self.parser.reset();
        self.request.reset();
        self.response = WireState::new();

        if self.wire_buffer.capacity() > self.resp_limits.max_capacity {
            self.wire_buffer = Vec::with_capacity(self.resp_limits.default_capacity);
        } else {
            self.wire_buffer.clear();
        }
    }
}

impl<S: ConnectionData> HttpConnection<S> {
    /// Drives the session loop for one accepted connection until the peer
    /// closes, a deadline elapses, or the connection's lifetime/request
    /// budget is exhausted.
    #[inline]
    pub(crate) async fn run(&mut self, stream: &mut TcpStream) -> Result<(), io::Error> {
        match self.impl_run(stream).await {
            Ok(()) => Ok(()),
            Err(ErrorKind::Io(e)) => Err(e.0),
            Err(error) => {
                self.conn_limits
                    .send_error(
                        stream,
                        error,
                        self.response.version,
                        self.server_limits.json_errors,
                    )
                    .await
            }
        }
    }

    #[inline]
    async fn impl_run(&mut self, stream: &mut TcpStream) -> Result<(), ErrorKind> {
        self.connection.reset();
        self.connection_data.reset();
        self.session_id = next_session_id();
        self.stats.session_opened();
        let _guard = SessionGuard(&self.stats);

        let mut next_request_id: u64 = 1;

        while !self.is_expired() {
            self.reset_request_response();

            let read_result = self
                .parser
                .fill_buffer(stream, self.conn_limits.socket_read_timeout)
                .await;

            match read_result {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    self.stats.read_timeout();
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            match self.parse() {
                Ok(version) => self.response.version = version,
                Err(ErrorKind::InvalidUrl) => {
                    self.stats.read_fail();
                    log::log!(LogLevel::Warn, "session {}: malformed request url", self.session_id);
                    let _ = self
                        .send_fixed_response(stream, StatusCode::BadRequest, "url invalid")
                        .await;
                    break;
                }
                Err(error) => return Err(error),
            }
            self.stats.read_success();

            let Some(method) = self.request.method() else {
                log::log!(LogLevel::Warn, "session {}: unsupported method", self.session_id);
                if self
                    .send_fixed_response(stream, StatusCode::BadRequest, "current method not support")
                    .await
                    .is_err()
                {
                    break;
                }
                self.connection.request_count += 1;
                if !self.response.keep_alive {
                    break;
                }
                continue;
            };

            let segments = self.request.url().path_segments();
            let Some(handler) = self.router.search(segments) else {
                log::log!(LogLevel::Warn, "session {}: no route for request", self.session_id);
                if self
                    .send_fixed_response(stream, StatusCode::BadRequest, "current url not support")
                    .await
                    .is_err()
                {
                    break;
                }
                self.connection.request_count += 1;
                if !self.response.keep_alive {
                    break;
                }
                continue;
            };

            let owned_request = self.build_owned_request(method, next_request_id);
            next_request_id += 1;

            let (writer, receiver) = HttpResponseWriter::new();

            self.stats.handle_request();
            self.stats.working_handler_enter();
            // `Handler::handle` is `#[async_trait]`, so this is already a
            // `Pin<Box<dyn Future<Output = ()> + Send + '_>>` — boxed once,
            // by the macro, to make `Arc<dyn Handler<S>>` possible.
            let handler_future = handler.handle(&mut self.connection_data, owned_request, writer);
            let handler_result = catch_panicking_future(handler_future).await;
            self.stats.working_handler_exit();

            if handler_result.is_err() {
                self.stats.write_fail();
                log::log!(LogLevel::Error, "session {}: handler panicked", self.session_id);
                break;
            }

            let response = tokio::select! {
                biased;

                received = receiver => match received {
                    Ok(response) => response,
                    Err(_) => {
                        self.stats.write_timeout();
                        break;
                    }
                },
                _ = sleep(self.conn_limits.socket_write_timeout) => {
                    self.stats.write_timeout();
                    break;
                }
            };

            let keep_alive = self.response.keep_alive && !response.wants_force_disable_keep_alive();
            let head_only = matches!(method, Method::Head);

            match self.write_response(stream, response, head_only, keep_alive).await {
                Ok(()) => self.stats.write_success(),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    self.stats.write_timeout();
                    break;
                }
                Err(_) => {
                    self.stats.write_fail();
                    break;
                }
            }

            if !keep_alive {
                break;
            }
            self.connection.request_count += 1;
        }

        Ok(())
    }

    /// Copies every field a handler needs out of the zero-copy parse
    /// result before the parser's buffer is reused (`SPEC_FULL.md` §4.3
    /// step 5). `method` has already been confirmed `Some` by the caller.
    fn build_owned_request(&self, method: Method, request_id: u64) -> HttpRequest {
        let decode = self.options.auto_decode_url_parameters;
        let url = self.request.url();

        let segments = url
            .path_segments()
            .iter()
            .map(|raw| decode_segment(raw, method, decode))
            .collect();

        let mut headers = std::collections::HashMap::new();
        for header in self.request.headers_raw() {
            headers.insert(
                String::from_utf8_lossy(header.name).into_owned(),
                String::from_utf8_lossy(header.value).into_owned(),
            );
        }

        let mut query = std::collections::HashMap::new();
        for (key, value) in url.query_parts.iter() {
            query.insert(
                decode_segment(key, method, decode),
                decode_segment(value, method, decode),
            );
        }

        HttpRequest::new(
            method,
            self.session_id,
            request_id,
            self.request.body().unwrap_or(&[]).to_vec(),
            segments,
            headers,
            query,
            Instant::now(),
        )
    }

    /// Builds and writes a fixed, text/plain 400 response for the
    /// session's own route-miss/unsupported-method/malformed-url
    /// rejections (`SPEC_FULL.md` §7). Unlike [`Self::write_response`], no
    /// handler response exists yet, so this always counts as a completed
    /// write.
    async fn send_fixed_response(
        &mut self,
        stream: &mut TcpStream,
        status: StatusCode,
        message: &'static str,
    ) -> io::Result<()> {
        self.wire_buffer.clear();
        self.wire_buffer
            .extend_from_slice(status.to_first_line(self.response.version));
        self.wire_buffer.extend_from_slice(b"content-type: text/plain\r\n");
        self.wire_buffer
            .extend_from_slice(format!("content-length: {}\r\n", message.len()).as_bytes());
        self.wire_buffer.extend_from_slice(connection_header(self.response.keep_alive));
        self.wire_buffer.extend_from_slice(b"\r\n");
        self.wire_buffer.extend_from_slice(message.as_bytes());

        let result = self.conn_limits.write_bytes(stream, &self.wire_buffer).await;
        if result.is_ok() {
            self.stats.write_success();
        } else {
            self.stats.write_fail();
        }
        result
    }

    /// Finalizes gzip, `Connection`, and `Content-Length`, then writes the
    /// wire response (`SPEC_FULL.md` §4.3 step 7).
    async fn write_response(
        &mut self,
        stream: &mut TcpStream,
        mut response: HttpResponse,
        head_only: bool,
        keep_alive: bool,
    ) -> io::Result<()> {
        let accepts_gzip = self
            .request
            .header(b"accept-encoding")
            .map(accept_encoding_allows_gzip)
            .unwrap_or(false);

        let gzip = response.wants_force_gzip()
            || (self.options.auto_gzip && response.body().len() > 500 && accepts_gzip);

        if gzip {
            if response.compress_body().is_ok() {
                // `Content-Encoding` header appended below.
            }
        }

        self.wire_buffer.clear();
        self.wire_buffer
            .extend_from_slice(response.status().to_first_line(self.response.version));
        self.wire_buffer.extend_from_slice(b"content-type: ");
        self.wire_buffer.extend_from_slice(response.content_type().as_bytes());
        self.wire_buffer.extend_from_slice(b"\r\n");

        for (name, value) in response.extra_headers() {
            self.wire_buffer.extend_from_slice(name.as_bytes());
            self.wire_buffer.extend_from_slice(b": ");
            self.wire_buffer.extend_from_slice(value.as_bytes());
            self.wire_buffer.extend_from_slice(b"\r\n");
        }

        if gzip {
            self.wire_buffer.extend_from_slice(b"content-encoding: gzip\r\n");
        }

        self.wire_buffer
            .extend_from_slice(format!("content-length: {}\r\n", response.body().len()).as_bytes());
        self.wire_buffer.extend_from_slice(connection_header(keep_alive));
        self.wire_buffer.extend_from_slice(b"\r\n");

        if !head_only {
            self.wire_buffer.extend_from_slice(response.body());
        }

        self.conn_limits.write_bytes(stream, &self.wire_buffer).await
    }

    #[inline]
    fn is_expired(&self) -> bool {
        !self.response.keep_alive
            || self.connection.request_count >= self.conn_limits.max_requests_per_connection
            || self.connection.created.elapsed() > self.conn_limits.connection_lifetime
    }
}

fn connection_header(keep_alive: bool) -> &'static [u8] {
    if keep_alive {
        b"connection: keep-alive\r\n"
    } else {
        b"connection: close\r\n"
    }
}

fn accept_encoding_allows_gzip(value: &[u8]) -> bool {
    let Ok(value) = std::str::from_utf8(value) else {
        return false;
    };
    value
        .split(',')
        .map(|part| part.trim())
        .any(|part| part.eq_ignore_ascii_case("gzip") || part == "*")
}

/// GET requests tolerate a literal `|` in the raw target, substituting it
/// with `%7C` before the rest of the pipeline sees it (`SPEC_FULL.md` §4.3
/// step 2) so it survives percent-decoding back into `|` rather than
/// being rejected or misread as a separator. Applied here, at the owned
/// snapshot boundary, rather than inside the fixed-capacity zero-copy
/// scan buffer the low-level parser reuses across requests.
fn decode_segment(raw: &[u8], method: Method, decode: bool) -> String {
    let tolerated: std::borrow::Cow<[u8]> = if matches!(method, Method::Get) && raw.contains(&b'|') {
        let mut out = Vec::with_capacity(raw.len());
        for &byte in raw {
            if byte == b'|' {
                out.extend_from_slice(b"%7C");
            } else {
                out.push(byte);
            }
        }
        std::borrow::Cow::Owned(out)
    } else {
        std::borrow::Cow::Borrowed(raw)
    };

    if decode {
        percent_encoding::percent_decode(&tolerated)
            .decode_utf8_lossy()
            .into_owned()
    } else {
        String::from_utf8_lossy(&tolerated).into_owned()
    }
}

/// Polls `future` to completion, converting an unwind into
/// [`SessionError::HandlerPanic`]. The HTTP handler contract forbids
/// panicking across the dispatch boundary; this is the one place that
/// contract is enforced (`SPEC_FULL.md` §7).
async fn catch_panicking_future(
    mut future: Pin<Box<dyn Future<Output = ()> + Send + '_>>,
) -> Result<(), SessionError> {
    std::future::poll_fn(move |cx| {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| future.as_mut().poll(cx))) {
            Ok(Poll::Ready(())) => Poll::Ready(Ok(())),
            Ok(Poll::Pending) => Poll::Pending,
            Err(_) => Poll::Ready(Err(SessionError::HandlerPanic)),
        }
    })
    .await
}

struct SessionGuard<'a>(&'a HttpStatistics);

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.0.session_closed();
    }
}

impl ConnLimits {
    #[inline]
    pub(crate) async fn send_error(
        &self,
        stream: &mut TcpStream,
        error: ErrorKind,
        version: Version,
        json_errors: bool,
    ) -> Result<(), io::Error> {
        self.write_bytes(stream, error.as_http(version, json_errors))
            .await
    }

    #[inline]
    pub(crate) async fn write_bytes(
        &self,
        stream: &mut TcpStream,
        response: &[u8],
    ) -> Result<(), io::Error> {
        tokio::select! {
            biased;

            result = stream.write_all(response) => result,
            _ = sleep(self.socket_write_timeout) => {
                Err(io::Error::new(io::ErrorKind::TimedOut, "write timeout"))
            },
        }
    }
}

#[derive(Debug)]
pub(crate) struct Connection {
    created: Instant,
    request_count: usize,
}

impl Connection {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            created: Instant::now(),
            request_count: 0,
        }
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.created = Instant::now();
        self.request_count = 0;
    }
}

//

/// Storage for user data between requests within a single HTTP
/// keep-alive connection.
///
/// # Examples
/// ```no_run
/// use httpserver::ConnectionData;
/// use std::collections::HashMap;
///
/// struct MyConnectionData {
///     user_id: Option<i32>,
///     request_count: usize,
///     cache: HashMap<usize, [u8; 4]>,
/// }
///
/// impl ConnectionData for MyConnectionData {
///     fn new() -> Self {
///         Self {
///             user_id: None,
///             request_count: 0,
///             cache: HashMap::new(),
///         }
///     }
///
///     fn reset(&mut self) {
///         self.user_id = None;
///         self.request_count = 0;
///         self.cache.clear(); // Saving the allocated memory
///     }
/// }
/// ```
pub trait ConnectionData: Sync + Send + 'static {
    /// Creates a new instance of user data.
    ///
    /// It is called once at server startup, which avoids runtime allocations.
    fn new() -> Self;

    /// Resets the internal state of the instance to its initial values.
    ///
    /// It is called after the connection is closed. Allows repeated
    /// use of the instance for the following connections. If implemented
    /// correctly, avoids any allocations.
    fn reset(&mut self);
}

impl ConnectionData for () {
    #[inline(always)]
    fn new() -> Self {}

    #[inline(always)]
    fn reset(&mut self) {}
}

//

#[cfg(test)]
mod def_handler {
    use super::*;
    use crate::{
        http::request::Request as ZeroCopyRequest,
        response::HttpResponse,
        router::Router,
        stats::HttpStatistics,
    };

    pub(crate) struct DefHandler;

    #[async_trait::async_trait]
    impl Handler<()> for DefHandler {
        async fn handle(&self, _: &mut (), _: HttpRequest, writer: HttpResponseWriter) {
            writer.send(HttpResponse::new(StatusCode::Ok, b"test".to_vec(), "text/plain"));
        }
    }

    impl HttpConnection<()> {
        #[inline]
        pub(crate) fn from_req<V: AsRef<[u8]>>(value: V) -> Self {
            let req_limits = ReqLimits::default().precalculate();
            let resp_limits = RespLimits::default();

            Self {
                connection_data: (),
                connection: Connection::new(),
                parser: Parser::from(&req_limits, value),
                request: ZeroCopyRequest::new(&req_limits),
                response: WireState::new(),

                router: Arc::new(Router::new()),
                options: Arc::new(ServerOptions::default()),
                stats: Arc::new(HttpStatistics::new()),

                wire_buffer: Vec::with_capacity(resp_limits.default_capacity),

                server_limits: ServerLimits::default(),
                conn_limits: ConnLimits::default(),
                req_limits,
                resp_limits,
                session_id: 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{response::HttpResponse, router::Router, stats::HttpStatistics};
    use std::sync::Mutex;
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn decode_segment_percent_decodes_and_tolerates_literal_pipe() {
        // SPEC_FULL.md §8 scenario 5: `destination=25.67,-80.37,0%7C0,,SW%20113th%20Pl`.
        let decoded = decode_segment(
            b"25.67,-80.37,0%7C0,,SW%20113th%20Pl",
            Method::Get,
            true,
        );
        assert_eq!(decoded, "25.67,-80.37,0|0,,SW 113th Pl");
    }

    #[test]
    fn decode_segment_substitutes_literal_pipe_before_decoding_for_get() {
        let decoded = decode_segment(b"a|b", Method::Get, true);
        assert_eq!(decoded, "a|b");
    }

    #[test]
    fn decode_segment_leaves_raw_bytes_when_decoding_disabled() {
        let decoded = decode_segment(b"a%20b", Method::Post, false);
        assert_eq!(decoded, "a%20b");
    }

    struct EchoQuery;

    #[async_trait::async_trait]
    impl Handler<()> for EchoQuery {
        async fn handle(&self, _: &mut (), req: HttpRequest, writer: HttpResponseWriter) {
            let body = req.query("destination").unwrap_or("").as_bytes().to_vec();
            writer.send(HttpResponse::new(StatusCode::Ok, body, "text/plain"));
        }
    }

    struct FixedBody(Vec<u8>);

    #[async_trait::async_trait]
    impl Handler<()> for FixedBody {
        async fn handle(&self, _: &mut (), _: HttpRequest, writer: HttpResponseWriter) {
            writer.send(HttpResponse::new(StatusCode::Ok, self.0.clone(), "text/plain"));
        }
    }

    struct IdCapture(Arc<Mutex<Vec<(u64, u64)>>>);

    #[async_trait::async_trait]
    impl Handler<()> for IdCapture {
        async fn handle(&self, _: &mut (), req: HttpRequest, writer: HttpResponseWriter) {
            self.0.lock().unwrap().push((req.session_id(), req.request_id()));
            writer.send(HttpResponse::new(StatusCode::Ok, b"ok".to_vec(), "text/plain"));
        }
    }

    fn test_connection<H: Handler<()>>(path: &str, handler: H) -> HttpConnection<()> {
        let req_limits = ReqLimits::default().precalculate();
        let mut router: Router<()> = Router::new();
        router.insert(path, Arc::new(handler)).unwrap();

        HttpConnection::new(
            Arc::new(router),
            Arc::new(ServerOptions::default()),
            Arc::new(HttpStatistics::new()),
            (
                ServerLimits::default(),
                ConnLimits::default(),
                req_limits,
                RespLimits::default(),
            ),
        )
    }

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (server, client) = tokio::join!(
            async { listener.accept().await.unwrap().0 },
            async { TcpStream::connect(addr).await.unwrap() },
        );
        (server, client)
    }

    async fn read_response(client: &mut TcpStream) -> (String, Vec<u8>) {
        use tokio::io::AsyncReadExt;

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = client.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers completed");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let content_length: usize = String::from_utf8_lossy(&buf[..header_end])
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse().ok())
                    .flatten()
            })
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = client.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body completed");
            buf.extend_from_slice(&chunk[..n]);
        }

        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let body = buf[header_end..header_end + content_length].to_vec();
        (head, body)
    }

    #[tokio::test]
    async fn end_to_end_query_is_percent_decoded() {
        let mut connection = test_connection("/geo", EchoQuery);
        let (mut server, mut client) = loopback_pair().await;

        let request = "GET /geo?destination=25.67,-80.37,0%7C0,,SW%20113th%20Pl HTTP/1.1\r\n\
                        Host: localhost\r\n\
                        Connection: close\r\n\
                        \r\n";

        let client_task = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            client.write_all(request.as_bytes()).await.unwrap();
            let (head, body) = read_response(&mut client).await;
            (head, body)
        });

        connection.run(&mut server).await.unwrap();
        let (head, body) = client_task.await.unwrap();

        assert!(head.starts_with("HTTP/1.1 200"));
        assert_eq!(body, b"25.67,-80.37,0|0,,SW 113th Pl");
    }

    #[tokio::test]
    async fn end_to_end_large_body_is_gzipped_when_accepted() {
        let body = vec![b'A'; 600];
        let mut connection = test_connection("/big", FixedBody(body.clone()));
        let (mut server, mut client) = loopback_pair().await;

        let request = "GET /big HTTP/1.1\r\n\
                        Host: localhost\r\n\
                        Accept-Encoding: gzip\r\n\
                        Connection: close\r\n\
                        \r\n";

        let client_task = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            client.write_all(request.as_bytes()).await.unwrap();
            read_response(&mut client).await
        });

        connection.run(&mut server).await.unwrap();
        let (head, compressed) = client_task.await.unwrap();

        assert!(head.to_lowercase().contains("content-encoding: gzip"));

        let mut decoder = flate2::read::GzDecoder::new(&compressed[..]);
        let mut decompressed = Vec::new();
        std::io::Read::read_to_end(&mut decoder, &mut decompressed).unwrap();
        assert_eq!(decompressed, body);
    }

    #[tokio::test]
    async fn request_ids_are_monotonic_within_a_session_and_sessions_increase() {
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut first_connection = test_connection("/tag", IdCapture(seen.clone()));
        let (mut server, mut client) = loopback_pair().await;

        let requests = "GET /tag HTTP/1.1\r\nHost: x\r\n\r\n\
                         GET /tag HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n";

        let client_task = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            client.write_all(requests.as_bytes()).await.unwrap();
            let _ = read_response(&mut client).await;
            let _ = read_response(&mut client).await;
        });

        first_connection.run(&mut server).await.unwrap();
        client_task.await.unwrap();

        let mut second_connection = test_connection("/tag", IdCapture(seen.clone()));
        let (mut server2, mut client2) = loopback_pair().await;

        let client_task2 = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            client2
                .write_all(b"GET /tag HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let _ = read_response(&mut client2).await;
        });

        second_connection.run(&mut server2).await.unwrap();
        client_task2.await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);

        let (first_session, first_request) = seen[0];
        let (same_session, second_request) = seen[1];
        assert_eq!(first_session, same_session);
        assert_eq!(first_request, 1);
        assert_eq!(second_request, 2);

        let (second_session, third_request) = seen[2];
        assert!(second_session > first_session);
        assert_eq!(third_request, 1);
    }
}
