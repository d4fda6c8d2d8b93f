//! Server-wide configuration, and the gzip compression level enum.
//!
//! `ServerOptions` is the Rust-native reshaping of
//! `original_source/include/httpserver/detail/http_types.h`'s
//! `HttpServerOptions`, expressed the way the teacher already splits its
//! own configuration into small `Copy`/`Clone` structs (`ServerLimits`,
//! `ConnLimits`, `ReqLimits`, `RespLimits` in `limits.rs`) rather than one
//! monolithic options bag. `ServerOptions` plays the `ServerLimits`-
//! equivalent role for this spec's concerns (bind address, timeouts,
//! gzip/url-decode policy) and is additive alongside — not a replacement
//! for — the teacher's existing buffer/size limit structs: `read_timeout_secs`/
//! `write_timeout_secs`/`max_request_size` are folded into a `ConnLimits`/
//! `ReqLimits` pair at `HttpServer::new` rather than duplicating the
//! teacher's own timeout/buffer-sizing machinery (`SPEC_FULL.md` §4.7).

use crate::error::ConfigError;
use std::time::Duration;

/// Stand-in for "no deadline". `Duration::MAX` risks overflow the moment
/// it's added to an `Instant` inside `tokio::time::sleep`; 100 years is
/// comfortably longer than any real connection while staying far inside
/// that arithmetic's range.
const DISABLED_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);

/// Immutable-after-`run` server configuration.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// IPv4 dotted-quad bind address, e.g. `"0.0.0.0"`.
    pub address: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Number of worker tasks driving the reactor; must be ≥ 1.
    pub worker_threads: u32,
    /// Read deadline in seconds; `0` disables the deadline.
    pub read_timeout_secs: u64,
    /// Write deadline in seconds; `0` disables the deadline.
    pub write_timeout_secs: u64,
    /// Maximum accepted request size in bytes; must be > 0.
    pub max_request_size: u64,
    /// Automatically gzip-compress eligible responses (see `SPEC_FULL.md` §4.3 step 7).
    pub auto_gzip: bool,
    /// Percent-decode path segments and query parameters before handing the request to a handler.
    pub auto_decode_url_parameters: bool,
}

impl Default for ServerOptions {
    /// Matches `original_source`'s documented defaults: `addr="0.0.0.0"`,
    /// `port=6000`, `thread_num=1`, 60s read/write timeouts, a 2 MiB
    /// request cap, `auto_gzip` and `auto_decode_url_parameters` both on.
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 6000,
            worker_threads: 1,
            read_timeout_secs: 60,
            write_timeout_secs: 60,
            max_request_size: 2 * 1024 * 1024,
            auto_gzip: true,
            auto_decode_url_parameters: true,
        }
    }
}

impl ServerOptions {
    /// Validates the options ahead of `run`: worker count ≥ 1, request-size
    /// cap > 0, and a non-empty bind address.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::new("worker_threads must be at least 1"));
        }
        if self.max_request_size == 0 {
            return Err(ConfigError::new("max_request_size must be greater than 0"));
        }
        if self.address.is_empty() {
            return Err(ConfigError::new("address must not be empty"));
        }
        Ok(())
    }

    /// The read deadline `ConnLimits::socket_read_timeout` is armed with:
    /// `read_timeout_secs` seconds, or effectively unbounded when `0`.
    pub(crate) fn effective_read_timeout(&self) -> Duration {
        Self::effective_timeout(self.read_timeout_secs)
    }

    /// The write deadline `ConnLimits::socket_write_timeout` is armed with:
    /// `write_timeout_secs` seconds, or effectively unbounded when `0`.
    pub(crate) fn effective_write_timeout(&self) -> Duration {
        Self::effective_timeout(self.write_timeout_secs)
    }

    fn effective_timeout(secs: u64) -> Duration {
        match secs {
            0 => DISABLED_TIMEOUT,
            secs => Duration::from_secs(secs),
        }
    }
}

/// Gzip compression level, mirroring `http_types.h`'s `CompressionLevel`.
///
/// Mapped onto `flate2::Compression` at encode time (`Default` needs
/// special-casing since `-1` is not a valid zlib level number, it means
/// "let the library choose").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    /// No compression.
    None = 0,
    /// Fastest, least compact.
    BestSpeed = 1,
    /// Slowest, most compact.
    BestCompression = 9,
    /// `flate2`'s own default level.
    Default = -1,
}

impl CompressionLevel {
    pub(crate) fn to_flate2(self) -> flate2::Compression {
        match self {
            Self::None => flate2::Compression::none(),
            Self::BestSpeed => flate2::Compression::fast(),
            Self::BestCompression => flate2::Compression::best(),
            Self::Default => flate2::Compression::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_original_source_defaults() {
        let opts = ServerOptions::default();
        assert_eq!(opts.address, "0.0.0.0");
        assert_eq!(opts.port, 6000);
        assert_eq!(opts.worker_threads, 1);
        assert_eq!(opts.read_timeout_secs, 60);
        assert_eq!(opts.write_timeout_secs, 60);
        assert_eq!(opts.max_request_size, 2 * 1024 * 1024);
        assert!(opts.auto_gzip);
        assert!(opts.auto_decode_url_parameters);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn rejects_zero_workers_and_zero_request_size() {
        let mut opts = ServerOptions::default();
        opts.worker_threads = 0;
        assert!(opts.validate().is_err());

        let mut opts = ServerOptions::default();
        opts.max_request_size = 0;
        assert!(opts.validate().is_err());
    }
}
