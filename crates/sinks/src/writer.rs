//! Destination writer abstraction
//!
//! Every physical destination is a `LogWriter` shared as
//! `Arc<dyn LogWriter>`. Methods take `&self`: each implementation carries its
//! own synchronization, so concurrent emitters never tear a single record.

use std::fmt;
use std::io;

/// A physical log destination
pub trait LogWriter: Send + Sync + fmt::Debug {
    /// Write one encoded record in full
    ///
    /// Returns the number of bytes written, which is `buf.len()` on success.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Flush buffered data to the underlying device
    fn sync(&self) -> io::Result<()>;

    /// Release the underlying handle
    ///
    /// Idempotent. A later `write` may reopen the destination.
    fn close(&self) -> io::Result<()>;

    /// Destination name for errors and diagnostics
    fn name(&self) -> &str;

    /// Whether this writer owns a file on disk
    fn is_file_backed(&self) -> bool {
        false
    }
}
