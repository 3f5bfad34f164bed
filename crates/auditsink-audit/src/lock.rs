//! Exclusive lock adapters
//!
//! Two implementations of the [`IFileLock`] port:
//!
//! - [`FlockFileLock`] - `flock(2)` advisory locks, coordinating every process
//!   on the host that goes through this crate.
//! - [`InProcessLock`] - an in-memory lock table with the same semantics, for
//!   tests and single-process hosts.
//!
//! Both wait with a bound and report [`LockError::Timeout`] instead of
//! blocking forever.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use auditsink_core::domain::LockError;
use auditsink_core::ports::{IFileLock, LockGuard};
use tracing::{debug, trace};

/// First sleep between contended attempts
const INITIAL_BACKOFF: Duration = Duration::from_millis(2);

/// Longest sleep between contended attempts
const MAX_BACKOFF: Duration = Duration::from_millis(100);

// ============================================================================
// FlockFileLock
// ============================================================================

/// Advisory exclusive lock via `flock(2)`
///
/// The lock is taken on the file at `path` itself through a dedicated file
/// descriptor, so it is held per open file description: two handles in the
/// same process exclude each other just like two processes do. The file is
/// created if missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlockFileLock;

impl FlockFileLock {
    pub fn new() -> Self {
        Self
    }

    fn try_lock(file: &File) -> io::Result<bool> {
        loop {
            // SAFETY: the descriptor belongs to `file`, which is borrowed for
            // the duration of the call.
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if rc == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(code) if code == libc::EWOULDBLOCK => return Ok(false),
                Some(code) if code == libc::EINTR => continue,
                _ => return Err(err),
            }
        }
    }
}

impl IFileLock for FlockFileLock {
    fn lock_exclusive(&self, path: &Path, timeout: Duration) -> Result<LockGuard, LockError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| LockError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let started = Instant::now();
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let acquired = Self::try_lock(&file).map_err(|source| LockError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if acquired {
                break;
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout {
                    path: path.to_path_buf(),
                    waited_ms: waited.as_millis() as u64,
                });
            }

            trace!(path = %path.display(), backoff_ms = backoff.as_millis() as u64, "Lock contended, backing off");
            thread::sleep(backoff.min(timeout - waited));
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }

        debug!(
            path = %path.display(),
            waited_ms = started.elapsed().as_millis() as u64,
            "Acquired exclusive flock"
        );

        Ok(LockGuard::new(move || {
            // SAFETY: `file` is owned by this closure and still open.
            unsafe {
                libc::flock(file.as_raw_fd(), libc::LOCK_UN);
            }
            drop(file);
        }))
    }
}

// ============================================================================
// InProcessLock
// ============================================================================

#[derive(Debug, Default)]
struct LockTable {
    held: Mutex<HashSet<PathBuf>>,
    released: Condvar,
}

/// In-memory exclusive lock keyed by path
///
/// Clones share the same lock table.
#[derive(Debug, Clone, Default)]
pub struct InProcessLock {
    table: Arc<LockTable>,
}

impl InProcessLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if some guard for `path` is currently alive
    pub fn is_held(&self, path: &Path) -> bool {
        match self.table.held.lock() {
            Ok(held) => held.contains(path),
            Err(poisoned) => poisoned.into_inner().contains(path),
        }
    }

    fn poisoned(path: &Path) -> LockError {
        LockError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, "lock table poisoned"),
        }
    }
}

impl IFileLock for InProcessLock {
    fn lock_exclusive(&self, path: &Path, timeout: Duration) -> Result<LockGuard, LockError> {
        let key = path.to_path_buf();
        let started = Instant::now();
        let deadline = started + timeout;

        let mut held = self.table.held.lock().map_err(|_| Self::poisoned(path))?;
        while held.contains(&key) {
            let now = Instant::now();
            if now >= deadline {
                return Err(LockError::Timeout {
                    path: key,
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            let (guard, _) = self
                .table
                .released
                .wait_timeout(held, deadline - now)
                .map_err(|_| Self::poisoned(path))?;
            held = guard;
        }
        held.insert(key.clone());
        drop(held);

        let table = Arc::clone(&self.table);
        Ok(LockGuard::new(move || {
            match table.held.lock() {
                Ok(mut held) => {
                    held.remove(&key);
                }
                Err(poisoned) => {
                    poisoned.into_inner().remove(&key);
                }
            }
            table.released.notify_all();
        }))
    }
}
