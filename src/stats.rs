//! Process-atomic server statistics.
//!
//! All counters are lock-free and use [`Ordering::Relaxed`]: cross-counter
//! consistency (e.g. "a concurrent snapshot never shows `read_success` and
//! `write_success` momentarily out of step") is explicitly not required, the
//! same trade-off `original_source/include/httpserver/detail/http_types.h`'s
//! `HttpStatistics` struct and `src/http_statistics_internal.h` make.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// A point-in-time snapshot of [`HttpStatistics`], returned by
/// [`HttpStatistics::snapshot`] / [`crate::HttpServer::get_statistics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatisticsSnapshot {
    /// Number of currently open sessions.
    pub current_sessions: u32,
    /// Successfully completed reads of a full request.
    pub read_success: u64,
    /// Reads that failed to parse, or failed with an I/O error.
    pub read_fail: u64,
    /// Reads that were aborted by the read deadline.
    pub read_timeout: u64,
    /// Successfully completed writes of a full response.
    pub write_success: u64,
    /// Writes that failed with an I/O error (includes caught handler panics).
    pub write_fail: u64,
    /// Writes that were aborted by the write deadline.
    pub write_timeout: u64,
    /// Number of times a handler was invoked.
    pub handle_request: u64,
    /// Number of handler invocations currently in flight (synchronous-dispatch duration only).
    pub working_handler: u32,
}

/// Process-wide atomic counters backing [`StatisticsSnapshot`].
///
/// Grounded on `original_source/src/http_statistics_internal.h`
/// (`HttpStatisticsInternal`): one atomic field per counter, translated
/// field-for-field from `std::atomic<uint32_t>`/`std::atomic<uint64_t>`
/// into [`AtomicU32`]/[`AtomicU64`].
#[derive(Debug, Default)]
pub(crate) struct HttpStatistics {
    current_sessions: AtomicU32,
    read_success: AtomicU64,
    read_fail: AtomicU64,
    read_timeout: AtomicU64,
    write_success: AtomicU64,
    write_fail: AtomicU64,
    write_timeout: AtomicU64,
    handle_request: AtomicU64,
    working_handler: AtomicU32,
}

impl HttpStatistics {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Resets every counter to zero. Called by [`crate::HttpServer::run`].
    #[inline]
    pub(crate) fn reset(&self) {
        self.current_sessions.store(0, Ordering::Relaxed);
        self.read_success.store(0, Ordering::Relaxed);
        self.read_fail.store(0, Ordering::Relaxed);
        self.read_timeout.store(0, Ordering::Relaxed);
        self.write_success.store(0, Ordering::Relaxed);
        self.write_fail.store(0, Ordering::Relaxed);
        self.write_timeout.store(0, Ordering::Relaxed);
        self.handle_request.store(0, Ordering::Relaxed);
        self.working_handler.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn session_opened(&self) {
        self.current_sessions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn session_closed(&self) {
        self.current_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn read_success(&self) {
        self.read_success.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn read_fail(&self) {
        self.read_fail.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn read_timeout(&self) {
        self.read_timeout.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn write_success(&self) {
        self.write_success.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn write_fail(&self) {
        self.write_fail.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn write_timeout(&self) {
        self.write_timeout.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn handle_request(&self) {
        self.handle_request.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn working_handler_enter(&self) {
        self.working_handler.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn working_handler_exit(&self) {
        self.working_handler.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            current_sessions: self.current_sessions.load(Ordering::Relaxed),
            read_success: self.read_success.load(Ordering::Relaxed),
            read_fail: self.read_fail.load(Ordering::Relaxed),
            read_timeout: self.read_timeout.load(Ordering::Relaxed),
            write_success: self.write_success.load(Ordering::Relaxed),
            write_fail: self.write_fail.load(Ordering::Relaxed),
            write_timeout: self.write_timeout.load(Ordering::Relaxed),
            handle_request: self.handle_request.load(Ordering::Relaxed),
            working_handler: self.working_handler.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_zeroes_every_counter() {
        let stats = HttpStatistics::new();
        stats.session_opened();
        stats.read_success();
        stats.write_fail();
        stats.handle_request();
        stats.working_handler_enter();

        stats.reset();
        assert_eq!(stats.snapshot(), StatisticsSnapshot::default());
    }

    #[test]
    fn session_count_tracks_open_and_close() {
        let stats = HttpStatistics::new();
        stats.session_opened();
        stats.session_opened();
        stats.session_closed();

        assert_eq!(stats.snapshot().current_sessions, 1);
    }

    #[test]
    fn working_handler_enter_exit_nets_to_zero() {
        let stats = HttpStatistics::new();
        stats.working_handler_enter();
        stats.handle_request();
        stats.working_handler_exit();

        let snap = stats.snapshot();
        assert_eq!(snap.working_handler, 0);
        assert_eq!(snap.handle_request, 1);
    }
}
