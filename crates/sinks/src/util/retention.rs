//! Retention of superseded log files
//!
//! Rotating writers hand a [`SweepRequest`] to their [`RetentionWorker`]
//! after every rotation. The worker runs on a dedicated thread so listing,
//! deleting and compressing files never delays a write.
//!
//! # Sweep
//!
//! ```text
//! list <dir>/<prefix><label><suffix>[.lz4]  (minus the active file)
//!   → newest first by mtime
//!   → drop beyond max_files
//!   → drop mtime < now - max_age × unit
//!   → compress survivors (optional)
//! ```
//!
//! Every failure inside a sweep is logged at debug level and skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use chrono::format::{Parsed, StrftimeItems, parse};
use chrono::{DateTime, Local, TimeDelta};
use tokio::sync::{mpsc, oneshot};

use super::compress::{COMPRESSED_EXTENSION, compress_file, is_compressed};
use super::pattern::split_name;

/// How long superseded files are kept and whether they are compressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Age limit in `unit`s; 0 disables age-based deletion
    pub max_age: u32,

    /// Length of one age unit (the rotation bucket)
    pub unit: TimeDelta,

    /// LZ4-compress superseded files that survive the sweep
    pub compress: bool,
}

impl RetentionPolicy {
    pub fn new(max_age: u32, unit: TimeDelta, compress: bool) -> Self {
        Self {
            max_age,
            unit,
            compress,
        }
    }

    /// Keep everything, compress nothing
    pub fn disabled() -> Self {
        Self::new(0, TimeDelta::days(1), false)
    }

    /// Files last modified strictly before this instant are removed
    pub fn cutoff(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        if self.max_age == 0 {
            return None;
        }
        let age = self.unit.checked_mul(i32::try_from(self.max_age).ok()?)?;
        now.checked_sub_signed(age)
    }

    /// Whether a sweep under this policy could do anything
    pub fn is_active(&self) -> bool {
        self.max_age > 0 || self.compress
    }
}

/// Shape of the file names one writer leaves behind when it rotates
///
/// A name belongs to the writer when it reads `<prefix><label><suffix>`,
/// optionally followed by `.lz4`, and `<label>` parses under the strftime
/// `format`. Sibling destinations sharing the stem (`app.error.log` next to
/// `app.log`) never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedName {
    pub prefix: String,
    pub format: String,
    pub suffix: String,
}

impl RotatedName {
    pub fn new(prefix: impl Into<String>, format: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            format: format.into(),
            suffix: suffix.into(),
        }
    }

    /// Names of the form `<stem><sep><label>[.<ext>]` derived from `base`
    pub fn around(base: &Path, separator: char, format: impl Into<String>) -> Self {
        let (stem, ext) = split_name(base);
        let suffix = ext.map(|ext| format!(".{ext}")).unwrap_or_default();
        Self::new(format!("{stem}{separator}"), format, suffix)
    }

    pub fn matches(&self, name: &str) -> bool {
        let compressed = name
            .strip_suffix(COMPRESSED_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'));
        self.matches_plain(name) || compressed.is_some_and(|plain| self.matches_plain(plain))
    }

    fn matches_plain(&self, name: &str) -> bool {
        let Some(label) = name
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_suffix(self.suffix.as_str()))
        else {
            return false;
        };
        if label.is_empty() {
            return false;
        }
        let mut parsed = Parsed::new();
        parse(&mut parsed, label, StrftimeItems::new(&self.format)).is_ok()
    }
}

/// One unit of cleanup work
#[derive(Debug, Clone)]
pub struct SweepRequest {
    /// Directory holding the rotated files
    pub dir: PathBuf,

    /// Names of the superseded files this sweep may touch
    pub names: RotatedName,

    /// File currently open for writing; never touched
    pub active: PathBuf,

    /// Reference time for the age cutoff
    pub now: DateTime<Local>,

    pub policy: RetentionPolicy,

    /// Keep at most this many superseded files (newest first)
    pub max_files: Option<usize>,
}

/// Outcome of a sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub removed: usize,
    pub compressed: usize,
    pub failed: usize,
}

struct Candidate {
    path: PathBuf,
    modified: SystemTime,
}

impl SweepRequest {
    /// Apply the policy to the files matching this request
    pub fn run(&self) -> SweepStats {
        let mut stats = SweepStats::default();

        let mut candidates = match self.candidates() {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(dir = %self.dir.display(), error = %e, "retention listing failed");
                stats.failed += 1;
                return stats;
            }
        };
        stats.scanned = candidates.len();

        // newest first
        candidates.sort_by(|a, b| b.modified.cmp(&a.modified));

        let cutoff: Option<SystemTime> = self.policy.cutoff(self.now).map(SystemTime::from);
        let mut kept = 0usize;

        for candidate in candidates {
            let over_count = self.max_files.is_some_and(|max| kept >= max);
            let expired = cutoff.is_some_and(|cutoff| candidate.modified < cutoff);

            if over_count || expired {
                match fs::remove_file(&candidate.path) {
                    Ok(()) => stats.removed += 1,
                    Err(e) => {
                        tracing::debug!(path = %candidate.path.display(), error = %e, "retention delete failed");
                        stats.failed += 1;
                    }
                }
                continue;
            }

            kept += 1;

            if self.policy.compress && !is_compressed(&candidate.path) {
                match compress_file(&candidate.path) {
                    Ok(_) => stats.compressed += 1,
                    Err(e) => {
                        tracing::debug!(path = %candidate.path.display(), error = %e, "retention compress failed");
                        stats.failed += 1;
                    }
                }
            }
        }

        stats
    }

    fn candidates(&self) -> io::Result<Vec<Candidate>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path == self.active || !self.matches(&path) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let modified = metadata.modified()?;
            out.push(Candidate { path, modified });
        }
        Ok(out)
    }

    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.names.matches(name))
    }
}

enum Job {
    Sweep(SweepRequest),
    Barrier(oneshot::Sender<()>),
}

/// Dedicated maintenance thread for one rotating writer
///
/// Jobs run in submission order. Dropping the worker closes the queue and
/// joins the thread after the queued jobs finish.
#[derive(Debug)]
pub struct RetentionWorker {
    sender: Option<mpsc::UnboundedSender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Job::Sweep(req) => f.debug_tuple("Sweep").field(&req.dir).finish(),
            Job::Barrier(_) => f.write_str("Barrier"),
        }
    }
}

impl RetentionWorker {
    /// Start a worker thread named after the file it maintains
    pub fn spawn(name: &str) -> io::Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let handle = thread::Builder::new()
            .name(format!("retention-{name}"))
            .spawn(move || {
                while let Some(job) = receiver.blocking_recv() {
                    match job {
                        Job::Sweep(request) => {
                            let stats = request.run();
                            tracing::debug!(
                                dir = %request.dir.display(),
                                prefix = %request.names.prefix,
                                removed = stats.removed,
                                compressed = stats.compressed,
                                failed = stats.failed,
                                "retention sweep finished"
                            );
                        }
                        Job::Barrier(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue a sweep without waiting for it
    ///
    /// Returns false if the worker has shut down.
    pub fn schedule(&self, request: SweepRequest) -> bool {
        self.sender
            .as_ref()
            .is_some_and(|sender| sender.send(Job::Sweep(request)).is_ok())
    }

    /// Block until every job queued before this call has finished
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait_idle(&self) {
        let Some(sender) = self.sender.as_ref() else {
            return;
        };
        let (done, wait) = oneshot::channel();
        if sender.send(Job::Barrier(done)).is_ok() {
            let _ = wait.blocking_recv();
        }
    }
}

impl Drop for RetentionWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("retention worker panicked");
        }
    }
}

#[cfg(test)]
#[path = "retention_test.rs"]
mod retention_test;
