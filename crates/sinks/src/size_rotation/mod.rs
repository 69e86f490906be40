//! Size-rotating file writer
//!
//! Writes to the base path until the next write would push the file past
//! `max_size`. The full file is then renamed to a timestamped backup and a
//! fresh file is opened in its place:
//!
//! ```text
//! logs/
//! ├── app.log                              # open
//! ├── app-2025-01-02T15-04-05.000.log      # backup
//! └── app-2025-01-01T09-12-44.311.log.lz4  # backup, compressed
//! ```
//!
//! Backups beyond `max_backups` or older than `max_age` days are removed by
//! the retention worker, which also compresses the rest when asked to.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local, TimeDelta};
use parking_lot::Mutex;
use scribe_config::RotationConfig;

use crate::common::SinkError;
use crate::util::pattern::split_name;
use crate::util::{
    Clock, RetentionPolicy, RetentionWorker, RotatedName, SweepRequest, SystemClock,
};
use crate::writer::LogWriter;

/// Timestamp format embedded in backup names
pub const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

/// Configuration for a size-rotating writer
#[derive(Debug, Clone)]
pub struct SizeRotationConfig {
    /// Active file path
    pub path: PathBuf,

    /// Rotate before a write would exceed this many bytes
    pub max_size: u64,

    /// Backups to keep (0 = unlimited)
    pub max_backups: usize,

    /// Days to keep backups (0 = unlimited)
    pub max_age: u32,

    /// LZ4-compress backups
    pub compress: bool,
}

impl SizeRotationConfig {
    /// 100MB files, unlimited backups, no compression
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size: 100 * 1024 * 1024,
            max_backups: 0,
            max_age: 0,
            compress: false,
        }
    }

    /// Take limits from the `[output.rotation]` section
    pub fn from_rotation(path: impl Into<PathBuf>, rotation: &RotationConfig) -> Self {
        Self {
            path: path.into(),
            max_size: rotation.max_size_bytes(),
            max_backups: rotation.max_backups,
            max_age: rotation.max_age,
            compress: rotation.compress,
        }
    }

    #[must_use]
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use]
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
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

#[derive(Debug, Default)]
struct SizeState {
    file: Option<File>,
    size: u64,
}

/// Writer that rolls the active file over at a byte threshold
#[derive(Debug)]
pub struct SizeRotationWriter {
    path: PathBuf,
    name: String,
    max_size: u64,
    max_backups: usize,
    policy: RetentionPolicy,
    clock: Arc<dyn Clock>,
    state: Mutex<SizeState>,
    rotations: AtomicU64,
    retention: Option<RetentionWorker>,
}

impl SizeRotationWriter {
    pub fn new(config: SizeRotationConfig) -> Result<Self, SinkError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a writer that stamps backups with `clock`
    pub fn with_clock(config: SizeRotationConfig, clock: Arc<dyn Clock>) -> Result<Self, SinkError> {
        if config.path.as_os_str().is_empty() {
            return Err(SinkError::EmptyDestination);
        }
        if config.max_size == 0 {
            return Err(SinkError::config("max_size must be greater than 0"));
        }

        let policy = RetentionPolicy::new(config.max_age, TimeDelta::days(1), config.compress);
        let name = config.path.display().to_string();

        let retention = if policy.is_active() || config.max_backups > 0 {
            Some(RetentionWorker::spawn(&name)?)
        } else {
            None
        };

        Ok(Self {
            path: config.path,
            name,
            max_size: config.max_size,
            max_backups: config.max_backups,
            policy,
            clock,
            state: Mutex::new(SizeState::default()),
            rotations: AtomicU64::new(0),
            retention,
        })
    }

    /// Active file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Bytes in the active file as tracked by the writer
    pub fn current_size(&self) -> u64 {
        self.state.lock().size
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    /// Block until queued retention sweeps have finished
    pub fn wait_for_maintenance(&self) {
        if let Some(retention) = &self.retention {
            retention.wait_idle();
        }
    }

    /// Backup path for a rotation at `now`
    pub fn backup_path(&self, now: DateTime<Local>) -> PathBuf {
        let (stem, ext) = split_name(&self.path);
        let stamp = now.format(BACKUP_TIME_FORMAT);
        let name = match ext {
            Some(ext) => format!("{stem}-{stamp}.{ext}"),
            None => format!("{stem}-{stamp}"),
        };
        self.path.with_file_name(name)
    }

    fn ensure_dir(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Open the active file, continuing an existing one
    fn open_existing(&self, state: &mut SizeState) -> io::Result<()> {
        self.ensure_dir()?;
        let file = File::options().create(true).append(true).open(&self.path)?;
        state.size = file.metadata()?.len();
        state.file = Some(file);
        Ok(())
    }

    /// Move the active file to a backup and start a fresh one
    fn rotate(&self, state: &mut SizeState) -> io::Result<()> {
        if let Some(file) = state.file.take()
            && let Err(e) = file.sync_all()
        {
            tracing::warn!(path = %self.name, error = %e, "failed to sync log file before rotation");
        }
        state.size = 0;

        let now = self.clock.now();
        let backup = self.backup_path(now);
        match fs::rename(&self.path, &backup) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        self.ensure_dir()?;
        let file = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        state.file = Some(file);

        self.rotations.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            path = %self.name,
            backup = %backup.display(),
            "file rotation completed"
        );

        self.schedule_sweep(now);
        Ok(())
    }

    fn schedule_sweep(&self, now: DateTime<Local>) {
        let Some(retention) = &self.retention else {
            return;
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let request = SweepRequest {
            dir,
            names: RotatedName::around(&self.path, '-', BACKUP_TIME_FORMAT),
            active: self.path.clone(),
            now,
            policy: self.policy,
            max_files: (self.max_backups > 0).then_some(self.max_backups),
        };

        if !retention.schedule(request) {
            tracing::debug!(path = %self.name, "retention worker unavailable, sweep skipped");
        }
    }
}

impl LogWriter for SizeRotationWriter {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len() as u64;
        if len > self.max_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "write length {len} exceeds maximum file size {}",
                    self.max_size
                ),
            ));
        }

        let mut state = self.state.lock();

        if state.file.is_none() {
            self.open_existing(&mut state)?;
        }
        if state.size + len > self.max_size {
            self.rotate(&mut state)?;
        }

        let state = &mut *state;
        let Some(file) = state.file.as_mut() else {
            return Err(io::Error::other("log file is not open"));
        };
        match file.write_all(buf) {
            Ok(()) => {
                state.size += len;
                Ok(buf.len())
            }
            Err(e) => {
                // part of buf may have landed
                if let Ok(metadata) = file.metadata() {
                    state.size = metadata.len();
                }
                Err(e)
            }
        }
    }

    fn sync(&self) -> io::Result<()> {
        match self.state.lock().file.as_mut() {
            Some(file) => {
                file.flush()?;
                file.sync_all()
            }
            None => Ok(()),
        }
    }

    fn close(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.size = 0;
        match state.file.take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_file_backed(&self) -> bool {
        true
    }
}
