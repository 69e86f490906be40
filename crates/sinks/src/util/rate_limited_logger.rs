//! Rate-limited failure reporting
//!
//! A destination that keeps failing (disk full, revoked permissions) would
//! otherwise produce one diagnostic per record. This logs at most once per
//! interval and carries the number of suppressed failures.
//!
//! # Example
//!
//! ```ignore
//! use scribe_sinks::util::RateLimitedLogger;
//! use std::time::Duration;
//!
//! let logger = RateLimitedLogger::new(Duration::from_secs(10));
//!
//! // Only logs once per 10 seconds, even if called frequently
//! for _ in 0..1000 {
//!     logger.warn("logs/app.log", &io_error);
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between reports
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Rate-limited reporter for repeated write failures
///
/// Thread-safe: uses atomic counters and a mutex for the last log time.
#[derive(Debug)]
pub struct RateLimitedLogger {
    /// Minimum interval between log messages
    min_interval: Duration,

    /// Last time we logged
    last_log_time: Mutex<Option<Instant>>,

    /// Failures since last log
    error_count: AtomicU64,

    /// Failures ever recorded
    total_errors: AtomicU64,
}

impl RateLimitedLogger {
    /// Create a logger with the specified interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            error_count: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
        }
    }

    /// Record a failure and log it if the interval has elapsed
    ///
    /// Returns true if the failure was logged, false if it was suppressed.
    pub fn warn(&self, destination: &str, error: &dyn std::fmt::Display) -> bool {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        self.total_errors.fetch_add(1, Ordering::Relaxed);

        let should_log = {
            let mut last_time = self.last_log_time.lock();
            let now = Instant::now();

            match *last_time {
                Some(last) if now.duration_since(last) < self.min_interval => false,
                _ => {
                    *last_time = Some(now);
                    true
                }
            }
        };

        if !should_log {
            return false;
        }

        let count = self.error_count.swap(0, Ordering::Relaxed);
        let total = self.total_errors.load(Ordering::Relaxed);

        if count > 1 {
            tracing::warn!(
                destination = %destination,
                error = %error,
                suppressed_count = count - 1,
                total_errors = total,
                "log write failed (rate-limited)"
            );
        } else {
            tracing::warn!(
                destination = %destination,
                error = %error,
                total_errors = total,
                "log write failed"
            );
        }
        true
    }

    /// Failures recorded since the last log line
    pub fn pending_error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Failures ever recorded
    pub fn total_error_count(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}
