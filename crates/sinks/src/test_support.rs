//! Test support writers
//!
//! In-memory and failing destinations for exercising routing and error
//! aggregation without touching the file system. Only available with the
//! `test-support` feature.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::writer::LogWriter;

/// Writer that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemoryWriter {
    name: String,
    data: Mutex<Vec<u8>>,
    writes: AtomicUsize,
    syncs: AtomicUsize,
    closes: AtomicUsize,
}

impl MemoryWriter {
    /// Create an empty writer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.data.lock()).into_owned()
    }

    /// Written lines
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    /// Number of `write` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `sync` calls
    pub fn sync_count(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }

    /// Number of `close` calls
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl LogWriter for MemoryWriter {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.data.lock().extend_from_slice(buf);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(buf.len())
    }

    fn sync(&self) -> io::Result<()> {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_file_backed(&self) -> bool {
        true
    }
}

/// Writer whose every operation fails
#[derive(Debug)]
pub struct FailingWriter {
    name: String,
    attempts: AtomicUsize,
}

impl FailingWriter {
    /// Create a failing writer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of failed write attempts
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl LogWriter for FailingWriter {
    fn write(&self, _buf: &[u8]) -> io::Result<usize> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::other(format!("{} is unavailable", self.name)))
    }

    fn sync(&self) -> io::Result<()> {
        Err(io::Error::other(format!("{} cannot sync", self.name)))
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
