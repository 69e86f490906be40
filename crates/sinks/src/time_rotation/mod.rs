//! Time-rotating file writer
//!
//! Owns one open file for a logical base path. Every write renders the
//! current bucket label from a [`TimePattern`]; when the label differs from
//! the open file's, the old handle is closed and a new file is opened before
//! the write proceeds.
//!
//! # File Naming
//!
//! The label is inserted before the extension of the base path:
//!
//! ```text
//! logs/app.log + %Y-%m-%d
//! logs/
//! ├── app.2025-01-01.log.lz4   # superseded, compressed by retention
//! ├── app.2025-01-02.log       # superseded
//! └── app.2025-01-03.log       # open
//! ```
//!
//! # States
//!
//! ```text
//! Closed --write--> Open(bucket) --write, bucket changed--> Open(new bucket)
//!    ^                   |
//!    +------close--------+
//! ```
//!
//! The state is guarded by one mutex and the clock is read while holding it,
//! so a single write never lands in two files and a superseded bucket is
//! never reopened by a caller that read the time earlier. If opening the new
//! file fails the writer stays Closed and the next write retries.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use scribe_config::RotationConfig;

use crate::common::SinkError;
use crate::util::{
    Clock, RetentionPolicy, RetentionWorker, RotatedName, SweepRequest, SystemClock, TimePattern,
    bucketed_path,
};
use crate::writer::LogWriter;

/// Configuration for a time-rotating writer
#[derive(Debug, Clone)]
pub struct TimeRotationConfig {
    /// Base path; the bucket label goes before its extension
    pub path: PathBuf,

    /// strftime pattern for the bucket label (default: daily)
    pub pattern: String,

    /// Superseded files older than this many buckets are removed (0 = keep)
    pub max_age: u32,

    /// LZ4-compress superseded files
    pub compress: bool,
}

impl TimeRotationConfig {
    /// Daily rotation at `path` with no retention
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pattern: "%Y-%m-%d".into(),
            max_age: 0,
            compress: false,
        }
    }

    /// Take pattern and retention from the `[output.rotation]` section
    pub fn from_rotation(path: impl Into<PathBuf>, rotation: &RotationConfig) -> Self {
        Self {
            path: path.into(),
            pattern: rotation.time_pattern.clone(),
            max_age: rotation.max_age,
            compress: rotation.compress,
        }
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: u32) -> Self {
        self.max_age = max_age;
        self
    }

    #[must_use]
    pub fn with_compression(mut self) -> Self {
        self.compress = true;
        self
    }
}

/// Open handle or nothing
#[derive(Debug)]
enum RotationState {
    Closed,
    Open {
        bucket: String,
        path: PathBuf,
        file: File,
    },
}

/// Writer that switches files when the time bucket changes
#[derive(Debug)]
pub struct TimeRotationWriter {
    base: PathBuf,
    name: String,
    pattern: TimePattern,
    policy: RetentionPolicy,
    clock: Arc<dyn Clock>,
    state: Mutex<RotationState>,
    rotations: AtomicU64,
    retention: Option<RetentionWorker>,
}

impl TimeRotationWriter {
    /// Create a writer on the system clock
    ///
    /// No file is opened until the first write.
    pub fn new(config: TimeRotationConfig) -> Result<Self, SinkError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a writer reading time from `clock`
    pub fn with_clock(config: TimeRotationConfig, clock: Arc<dyn Clock>) -> Result<Self, SinkError> {
        if config.path.as_os_str().is_empty() {
            return Err(SinkError::EmptyDestination);
        }

        let pattern = TimePattern::new(config.pattern)?;
        let policy = RetentionPolicy::new(config.max_age, pattern.unit().duration(), config.compress);
        let name = config.path.display().to_string();

        let retention = if policy.is_active() {
            Some(RetentionWorker::spawn(&name)?)
        } else {
            None
        };

        Ok(Self {
            base: config.path,
            name,
            pattern,
            policy,
            clock,
            state: Mutex::new(RotationState::Closed),
            rotations: AtomicU64::new(0),
            retention,
        })
    }

    /// Base path this writer derives file names from
    pub fn base_path(&self) -> &Path {
        &self.base
    }

    pub fn pattern(&self) -> &TimePattern {
        &self.pattern
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Path of the open file, if any
    pub fn current_path(&self) -> Option<PathBuf> {
        match &*self.state.lock() {
            RotationState::Open { path, .. } => Some(path.clone()),
            RotationState::Closed => None,
        }
    }

    /// Bucket label of the open file, if any
    pub fn current_bucket(&self) -> Option<String> {
        match &*self.state.lock() {
            RotationState::Open { bucket, .. } => Some(bucket.clone()),
            RotationState::Closed => None,
        }
    }

    /// Number of times an open file was superseded by a new bucket
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    /// Block until queued retention sweeps have finished
    pub fn wait_for_maintenance(&self) {
        if let Some(retention) = &self.retention {
            retention.wait_idle();
        }
    }

    /// Replace the current handle with one for `bucket`
    ///
    /// Called with the state lock held. Leaves the state Closed on error.
    fn rotate(&self, state: &mut RotationState, bucket: String, now: DateTime<Local>) -> io::Result<()> {
        let previous = std::mem::replace(state, RotationState::Closed);
        let previous_bucket = match previous {
            RotationState::Open { bucket, path, file } => {
                if let Err(e) = file.sync_all() {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to sync superseded log file"
                    );
                }
                drop(file);
                Some(bucket)
            }
            RotationState::Closed => None,
        };

        let path = bucketed_path(&self.base, &bucket);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = File::options().create(true).append(true).open(&path)?;

        match &previous_bucket {
            Some(old_bucket) => {
                self.rotations.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    base = %self.name,
                    old_bucket = %old_bucket,
                    new_bucket = %bucket,
                    "file rotation completed"
                );
            }
            None => {
                tracing::debug!(path = %path.display(), "opened log file");
            }
        }

        self.schedule_sweep(&path, now);

        *state = RotationState::Open { bucket, path, file };
        Ok(())
    }

    fn schedule_sweep(&self, active: &Path, now: DateTime<Local>) {
        let Some(retention) = &self.retention else {
            return;
        };

        let dir = match self.base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let request = SweepRequest {
            dir,
            names: RotatedName::around(&self.base, '.', self.pattern.as_str()),
            active: active.to_path_buf(),
            now,
            policy: self.policy,
            max_files: None,
        };

        if !retention.schedule(request) {
            tracing::debug!(base = %self.name, "retention worker unavailable, sweep skipped");
        }
    }
}

impl LogWriter for TimeRotationWriter {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();

        let now = self.clock.now();
        let bucket = self.pattern.render(now);

        let stale = match &*state {
            RotationState::Open { bucket: current, .. } => *current != bucket,
            RotationState::Closed => true,
        };
        if stale {
            self.rotate(&mut state, bucket, now)?;
        }

        match &mut *state {
            RotationState::Open { file, .. } => {
                file.write_all(buf)?;
                Ok(buf.len())
            }
            RotationState::Closed => Err(io::Error::other("log file is not open")),
        }
    }

    fn sync(&self) -> io::Result<()> {
        match &mut *self.state.lock() {
            RotationState::Open { file, .. } => {
                file.flush()?;
                file.sync_all()
            }
            RotationState::Closed => Ok(()),
        }
    }

    fn close(&self) -> io::Result<()> {
        let previous = std::mem::replace(&mut *self.state.lock(), RotationState::Closed);
        match previous {
            RotationState::Open { file, .. } => file.sync_all(),
            RotationState::Closed => Ok(()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_file_backed(&self) -> bool {
        true
    }
}
