//! Shared machinery for file-backed writers
//!
//! - **clock**: injectable time source for rotation decisions
//! - **pattern**: strftime bucket labels and their granularity
//! - **compress**: LZ4 frame compression of superseded files
//! - **retention**: sweep policy and the per-writer maintenance thread
//! - **rate_limited_logger**: throttled reporting of repeated write failures
//!
//! ```text
//! [write] → [Clock::now] → [TimePattern::render] → bucket changed?
//!                                                     ↓ yes
//!                                    [reopen file] → [RetentionWorker::schedule]
//!                                                     ↓ (own thread)
//!                                          [delete expired] → [compress rest]
//! ```

pub mod clock;
pub mod compress;
pub mod pattern;
pub mod rate_limited_logger;
pub mod retention;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compress::{COMPRESSED_EXTENSION, compress_file, is_compressed};
pub use pattern::{BucketUnit, TimePattern, bucketed_path};
pub use rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
pub use retention::{RetentionPolicy, RetentionWorker, RotatedName, SweepRequest, SweepStats};
