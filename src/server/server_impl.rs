//! The server handle: construction, handler registration, the accept
//! loop, and graceful shutdown (component C4/C6 boundary).
//!
//! Grounded on the teacher's own `ServerBuilder`/`Server` (a fixed pool of
//! worker tasks pulling accepted sockets off a shared
//! `crossbeam::queue::SegQueue`, with dedicated "alarmist" tasks draining
//! a second queue with 503s under backpressure) with three additions: a
//! `tokio::sync::watch`-based stop signal (the same pattern
//! `chopin-core`'s `run_reuseport`/`accept_loop` uses for its own shutdown
//! future, the other HTTP-engine crate in this retrieval pack), a
//! `socket2`-configured listener (`SO_REUSEADDR`, disabled lingering,
//! backlog 1024 — matching `original_source/src/http_server_impl.cpp`'s
//! `reuse_address(true)` / `listen(1024, ec)`), and router-based dispatch
//! in place of the teacher's single fixed `Handler`.

use crate::{
    error::{ConfigError, ServerError, SocketError},
    errors::ErrorKind,
    limits::{ConnLimits, ReqLimits, RespLimits, ServerLimits, WaitStrategy},
    log::{self, LogLevel},
    options::ServerOptions,
    router::Router,
    server::connection::{self, ConnectionData, HttpConnection, SessionLimits},
    stats::{HttpStatistics, StatisticsSnapshot},
    Version,
};
use async_trait::async_trait;
use crossbeam::queue::SegQueue;
use std::{
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
    task::yield_now,
    time::sleep as tokio_sleep,
};

/// A trait for handling HTTP requests and producing a response.
///
/// `&self` carries shared, immutable state (a database pool, a template
/// cache); `&mut S` carries state scoped to the single keep-alive
/// connection the request arrived on (see [`ConnectionData`]). The
/// request is owned and the response is delivered through `writer`
/// rather than built in place, so a handler may freely move `writer` to
/// another task before returning (`SPEC_FULL.md` §4.5).
///
/// # Examples
///
/// ```
/// use httpserver::{async_trait, Handler, HttpRequest, HttpResponse, HttpResponseWriter, StatusCode};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Handler for Echo {
///     async fn handle(&self, _: &mut (), request: HttpRequest, writer: HttpResponseWriter) {
///         let mut body = request.body().to_vec();
///         body.extend_from_slice(b"_rsp");
///         writer.send(HttpResponse::new(StatusCode::Ok, body, "text/plain"));
///     }
/// }
/// ```
///
/// Handler with [`ConnectionData`]:
///
/// ```
/// use httpserver::{async_trait, ConnectionData, Handler, HttpRequest, HttpResponse, HttpResponseWriter, StatusCode};
///
/// struct Counting;
///
/// #[async_trait]
/// impl Handler<State> for Counting {
///     async fn handle(&self, data: &mut State, _: HttpRequest, writer: HttpResponseWriter) {
///         data.request_count += 1;
///         writer.send(HttpResponse::new(
///             StatusCode::Ok,
///             format!("Request #{}", data.request_count).into_bytes(),
///             "text/plain",
///         ));
///     }
/// }
///
/// struct State {
///     request_count: usize,
/// }
///
/// impl ConnectionData for State {
///     fn new() -> Self {
///         Self { request_count: 0 }
///     }
///
///     fn reset(&mut self) {
///         self.request_count = 0;
///     }
/// }
/// ```
///
/// # Dynamic dispatch
///
/// The router stores handlers behind `Arc<dyn Handler<S>>`, so every
/// implementation must carry the [`async_trait`] attribute: a plain
/// `async fn` in a trait is not object-safe (its return type has no
/// fixed size), and `async_trait` boxes the returned future to make one
/// possible. This mirrors how `chopin-core`, the other HTTP engine in
/// this crate's retrieval pack, type-erases its own async trait objects.
#[async_trait]
pub trait Handler<S = ()>
where
    Self: Sync + Send + 'static,
    S: ConnectionData,
{
    /// Processes an HTTP request and delivers a response through `writer`.
    ///
    /// Must not panic: the session catches an escaping panic at the
    /// dispatch boundary and closes the connection, but this is a safety
    /// net, not a sanctioned error-reporting channel
    /// (`SPEC_FULL.md` §7).
    async fn handle(
        &self,
        connection_data: &mut S,
        request: crate::HttpRequest,
        writer: crate::HttpResponseWriter,
    );
}

/// An HTTP/1.1 server: owns configuration, the route table, and process-
/// wide statistics. Register handlers with [`Self::register_handler`],
/// then drive the accept loop with [`Self::run`].
///
/// # Examples
/// ```no_run
/// use httpserver::{HttpServer, ServerOptions};
/// # httpserver::impt_default_handler!{MyHandler}
///
/// #[tokio::main]
/// async fn main() {
///     let mut server = HttpServer::<()>::new(ServerOptions::default()).unwrap();
///     server.register_handler("/hello", MyHandler).unwrap();
///     server.run().await.unwrap();
/// }
/// ```
pub struct HttpServer<S: ConnectionData = ()> {
    options: Arc<ServerOptions>,
    router: Arc<Router<S>>,
    stats: Arc<HttpStatistics>,

    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    stopped: Arc<AtomicBool>,

    server_limits: ServerLimits,
    conn_limits: ConnLimits,
    req_limits: ReqLimits,
    resp_limits: RespLimits,
}

impl<S: ConnectionData> HttpServer<S> {
    /// Validates `options` and constructs a server with the teacher's
    /// existing default limits (`ServerLimits`/`ConnLimits`/`ReqLimits`/
    /// `RespLimits`), which remain independently tunable through
    /// [`Self::with_limits`].
    ///
    /// `options.read_timeout_secs`/`write_timeout_secs` and
    /// `max_request_size` are folded into the default `ConnLimits`/
    /// `ReqLimits` here (a zero timeout disables the deadline rather than
    /// firing immediately; `max_request_size` bounds the precalculated
    /// receive buffer), so the two option fields actually reach the
    /// session instead of being shadowed by the teacher's independent
    /// defaults. Calling [`Self::with_limits`] afterward still replaces
    /// these wholesale, same as any other limit override.
    pub fn new(options: ServerOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let (stop_tx, stop_rx) = watch::channel(false);

        let conn_limits = ConnLimits {
            socket_read_timeout: options.effective_read_timeout(),
            socket_write_timeout: options.effective_write_timeout(),
            ..ConnLimits::default()
        };
        let req_limits = ReqLimits::default()
            .bounded_by(options.max_request_size)
            .precalculate();

        Ok(Self {
            options: Arc::new(options),
            router: Arc::new(Router::new()),
            stats: Arc::new(HttpStatistics::new()),

            stop_tx,
            stop_rx,
            stopped: Arc::new(AtomicBool::new(false)),

            server_limits: ServerLimits::default(),
            conn_limits,
            req_limits,
            resp_limits: RespLimits::default(),
        })
    }

    /// Overrides the teacher's parse/response/connection limit defaults
    /// (including the `ConnLimits`/`ReqLimits` [`Self::new`] already
    /// derived from `ServerOptions`). Must be called before [`Self::run`].
    pub fn with_limits(
        mut self,
        server_limits: ServerLimits,
        conn_limits: ConnLimits,
        req_limits: ReqLimits,
        resp_limits: RespLimits,
    ) -> Self {
        self.server_limits = server_limits;
        self.conn_limits = conn_limits;
        self.req_limits = req_limits.precalculate();
        self.resp_limits = resp_limits;
        self
    }

    /// Registers `handler` at `path`, delegating to [`Router::insert`].
    ///
    /// Only valid before [`Self::run`] is ever called: once workers have
    /// cloned the router's `Arc`, this panics rather than silently
    /// registering a route no worker will ever see.
    #[track_caller]
    pub fn register_handler(
        &mut self,
        path: &str,
        handler: impl Handler<S>,
    ) -> Result<(), ConfigError> {
        let handler: Arc<dyn Handler<S>> = Arc::new(handler);
        Arc::get_mut(&mut self.router)
            .expect("register_handler must be called before run()")
            .insert(path, handler)
            .map_err(|e| ConfigError::new(e.to_string()))
    }

    /// Binds, listens, and drives the accept loop until [`Self::stop`] is
    /// called. Spawns `options.worker_threads` long-lived worker tasks
    /// (the teacher's `ServerBuilder::spawn_worker` pattern) plus
    /// `server_limits.count_503_handlers` alarmist tasks for admission
    /// overflow, matching `SPEC_FULL.md` §4.4.
    pub async fn run(&self) -> Result<(), ServerError> {
        self.options.validate().map_err(ServerError::Config)?;
        connection::reset_session_counter();
        self.stats.reset();
        self.stopped.store(false, Ordering::SeqCst);

        let listener = bind_listener(&self.options)?;
        log::log!(
            LogLevel::Info,
            "listening on {}:{}",
            self.options.address,
            self.options.port
        );

        let stream_queue: TcpQueue = Arc::new(SegQueue::new());
        let error_queue: TcpQueue = Arc::new(SegQueue::new());

        let limits: SessionLimits = (
            self.server_limits.clone(),
            self.conn_limits.clone(),
            self.req_limits.clone(),
            self.resp_limits.clone(),
        );

        let mut workers = Vec::with_capacity(self.options.worker_threads as usize);
        for _ in 0..self.options.worker_threads {
            workers.push(spawn_worker(
                stream_queue.clone(),
                self.router.clone(),
                self.options.clone(),
                self.stats.clone(),
                limits.clone(),
                self.stop_rx.clone(),
            ));
        }

        let alarmist_count = self.server_limits.count_503_handlers;
        let mut alarmists = Vec::with_capacity(alarmist_count.max(1));
        if alarmist_count != 0 {
            for _ in 0..alarmist_count {
                alarmists.push(spawn_alarmist(
                    error_queue.clone(),
                    self.server_limits.clone(),
                    self.conn_limits.clone(),
                    self.stop_rx.clone(),
                ));
            }
        } else {
            alarmists.push(spawn_quiet_alarmist(error_queue.clone(), self.stop_rx.clone()));
        }

        let mut stop_rx = self.stop_rx.clone();
        loop {
            tokio::select! {
                biased;

                _ = stop_rx.changed() => break,
                accepted = listener.accept() => {
                    let Ok((stream, _addr)) = accepted else { continue };

                    if stream_queue.len() < self.server_limits.max_pending_connections {
                        stream_queue.push(stream);
                    } else {
                        error_queue.push(stream);
                    }
                }
            }
        }

        for worker in workers {
            let _ = worker.await;
        }
        for alarmist in alarmists {
            let _ = alarmist.await;
        }
        self.stopped.store(true, Ordering::SeqCst);

        Ok(())
    }

    /// Signals [`Self::run`] to unwind: stops accepting, lets in-flight
    /// workers drain their current connection, then returns once every
    /// worker and alarmist task has joined. Thread-safe, idempotent.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
        log::log!(LogLevel::Info, "stop requested");
    }

    /// A lock-free snapshot of the process-wide counters.
    pub fn get_statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }
}

type TcpQueue = Arc<SegQueue<TcpStream>>;

fn bind_listener(options: &ServerOptions) -> Result<TcpListener, ServerError> {
    let ip: std::net::IpAddr = options.address.parse().map_err(|_| {
        ServerError::Socket(SocketError::new(
            format!("invalid bind address '{}'", options.address),
            io::Error::new(io::ErrorKind::InvalidInput, "address does not parse"),
        ))
    })?;
    let addr = SocketAddr::new(ip, options.port);

    let domain = if addr.is_ipv4() {
        socket2::Domain::IPV4
    } else {
        socket2::Domain::IPV6
    };

    let socket = socket2::Socket::new(domain, socket2::Type::STREAM, Some(socket2::Protocol::TCP))
        .map_err(|e| ServerError::Socket(SocketError::new("failed to create socket", e)))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| ServerError::Socket(SocketError::new("failed to set SO_REUSEADDR", e)))?;
    socket
        .set_linger(None)
        .map_err(|e| ServerError::Socket(SocketError::new("failed to disable socket lingering", e)))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| ServerError::Socket(SocketError::new("failed to set socket non-blocking", e)))?;
    socket
        .bind(&addr.into())
        .map_err(|e| ServerError::Socket(SocketError::new(format!("failed to bind {addr}"), e)))?;
    socket
        .listen(1024)
        .map_err(|e| ServerError::Socket(SocketError::new("failed to listen", e)))?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
        .map_err(|e| ServerError::Socket(SocketError::new("failed to hand listener to tokio", e)))
}

#[inline]
fn spawn_worker<S: ConnectionData>(
    queue: TcpQueue,
    router: Arc<Router<S>>,
    options: Arc<ServerOptions>,
    stats: Arc<HttpStatistics>,
    limits: SessionLimits,
    mut stop_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let wait_strategy = limits.0.wait_strategy.clone();
    let mut conn = HttpConnection::new(router, options, stats, limits);

    tokio::spawn(async move {
        loop {
            let Some(mut stream) = get_stream(&queue, &wait_strategy, &mut stop_rx).await else {
                break;
            };
            let _ = conn.run(&mut stream).await;
        }
    })
}

#[inline]
fn spawn_alarmist(
    queue: TcpQueue,
    server_limits: ServerLimits,
    conn_limits: ConnLimits,
    mut stop_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Some(mut stream) = get_stream(&queue, &server_limits.wait_strategy, &mut stop_rx).await
            else {
                break;
            };

            let _ = conn_limits
                .send_error(
                    &mut stream,
                    ErrorKind::ServiceUnavailable,
                    Version::Http11,
                    server_limits.json_errors,
                )
                .await;
        }
    })
}

#[inline]
fn spawn_quiet_alarmist(
    queue: TcpQueue,
    mut stop_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match get_stream(&queue, &WaitStrategy::Yield, &mut stop_rx).await {
                Some(stream) => drop(stream),
                None => break,
            }
        }
    })
}

/// Pops a socket off `queue`, waiting per `wait` when empty; returns
/// `None` once [`HttpServer::stop`] has fired and the queue has drained,
/// so a worker's own loop ends naturally rather than needing an external
/// cancellation.
#[inline]
async fn get_stream(
    queue: &TcpQueue,
    wait: &WaitStrategy,
    stop_rx: &mut watch::Receiver<bool>,
) -> Option<TcpStream> {
    loop {
        if let Some(stream) = queue.pop() {
            return Some(stream);
        }
        if *stop_rx.borrow() {
            return None;
        }

        tokio::select! {
            biased;

            _ = stop_rx.changed() => {}
            _ = async {
                match wait {
                    WaitStrategy::Yield => yield_now().await,
                    WaitStrategy::Sleep(time) => tokio_sleep(*time).await,
                }
            } => {}
        }
    }
}
