//! Console writer - stdout / stderr passthrough
//!
//! No rotation, no lifecycle: the process owns the streams. Each record is
//! written while holding the stream lock, so concurrent records interleave by
//! line but never within one.

use std::fmt;
use std::io::{self, Write};

use crate::writer::LogWriter;

/// Which standard stream to write to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleStream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

impl ConsoleStream {
    /// Configuration name of this stream
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }

    /// Parse a destination string naming a console stream
    pub fn parse(destination: &str) -> Option<Self> {
        match destination {
            "stdout" => Some(Self::Stdout),
            "stderr" => Some(Self::Stderr),
            _ => None,
        }
    }
}

impl fmt::Display for ConsoleStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Passthrough writer for a console stream
#[derive(Debug, Clone, Copy)]
pub struct ConsoleWriter {
    stream: ConsoleStream,
}

impl ConsoleWriter {
    /// Create a writer for `stream`
    pub const fn new(stream: ConsoleStream) -> Self {
        Self { stream }
    }

    /// Writer for standard output
    pub const fn stdout() -> Self {
        Self::new(ConsoleStream::Stdout)
    }

    /// Writer for standard error
    pub const fn stderr() -> Self {
        Self::new(ConsoleStream::Stderr)
    }

    /// The stream this writer targets
    pub const fn stream(&self) -> ConsoleStream {
        self.stream
    }
}

impl LogWriter for ConsoleWriter {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        match self.stream {
            ConsoleStream::Stdout => io::stdout().lock().write_all(buf)?,
            ConsoleStream::Stderr => io::stderr().lock().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn sync(&self) -> io::Result<()> {
        match self.stream {
            ConsoleStream::Stdout => io::stdout().lock().flush(),
            ConsoleStream::Stderr => io::stderr().lock().flush(),
        }
    }

    fn close(&self) -> io::Result<()> {
        self.sync()
    }

    fn name(&self) -> &str {
        self.stream.as_str()
    }
}
