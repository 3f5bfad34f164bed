//! AppendSink - writes audit records to the audit file
//!
//! Each append renders one record into a single buffer and hands it to one
//! `write_all` on an `O_APPEND` descriptor while the exclusive lock is held,
//! so concurrent appenders (threads or processes) never interleave mid-line
//! and never write through a pruner's write-back. The file and any missing
//! parent directories are created on first use. Failures are returned to the
//! caller, never swallowed.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use auditsink_core::domain::AuditRecord;
use auditsink_core::ports::IFileLock;
use tracing::{debug, instrument};

use crate::error::AuditError;

/// Default bound on waiting for the append lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Append-only writer for one audit file
pub struct AppendSink {
    path: PathBuf,
    lock: Arc<dyn IFileLock>,
    lock_timeout: Duration,
    sync_on_write: bool,
}

impl AppendSink {
    /// Creates a sink for `path` that serialises appends through `lock`
    pub fn new(path: impl Into<PathBuf>, lock: Arc<dyn IFileLock>) -> Self {
        Self {
            path: path.into(),
            lock,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            sync_on_write: true,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Whether each append is followed by `fdatasync`
    pub fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `record` as exactly one line
    ///
    /// # Errors
    ///
    /// - [`AuditError::Write`] if the directory or file cannot be created, or
    ///   the write or sync fails (e.g. disk full)
    /// - [`AuditError::Lock`] if the exclusive lock is not acquired in time
    #[instrument(skip(self, record), fields(path = %self.path.display(), level = %record.level()))]
    pub fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let line = record.render();
        self.append_line(line.as_bytes())?;
        debug!(bytes = line.len(), "Audit record appended");
        Ok(())
    }

    fn append_line(&self, line: &[u8]) -> Result<(), AuditError> {
        self.ensure_parent_dir()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AuditError::write(&self.path, e))?;

        let guard = self.lock.lock_exclusive(&self.path, self.lock_timeout)?;

        file.write_all(line)
            .map_err(|e| AuditError::write(&self.path, e))?;
        if self.sync_on_write {
            file.sync_data()
                .map_err(|e| AuditError::write(&self.path, e))?;
        }

        guard.release();
        Ok(())
    }

    fn ensure_parent_dir(&self) -> Result<(), AuditError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                debug!(path = %parent.display(), "Creating audit log directory");
                fs::create_dir_all(parent).map_err(|e| AuditError::write(&self.path, e))
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for AppendSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppendSink")
            .field("path", &self.path)
            .field("lock_timeout", &self.lock_timeout)
            .field("sync_on_write", &self.sync_on_write)
            .finish()
    }
}
