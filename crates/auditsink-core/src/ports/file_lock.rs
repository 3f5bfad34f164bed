//! Exclusive file lock port
//!
//! The audit file is shared, process-wide state. Every write to it, whether a
//! single appended line or the pruner's write-back, happens while holding the
//! exclusive lock handed out by an [`IFileLock`]. Appenders and the pruner
//! must share the same implementation for the exclusion to mean anything.
//!
//! ## Design Notes
//!
//! - Acquisition is bounded by a timeout; implementations never block forever.
//! - [`LockGuard`] is an RAII guard: dropping it releases the lock on every
//!   exit path, including early returns and panics.

use std::path::Path;
use std::time::Duration;

use crate::domain::errors::LockError;

/// Hands out exclusive locks on audit files
pub trait IFileLock: Send + Sync {
    /// Acquires the exclusive lock on `path`, waiting at most `timeout`
    ///
    /// # Errors
    ///
    /// - [`LockError::Timeout`] if the lock is still held elsewhere after `timeout`
    /// - [`LockError::Io`] if the lock cannot be attempted at all
    fn lock_exclusive(&self, path: &Path, timeout: Duration) -> Result<LockGuard, LockError>;
}

/// RAII handle for a held exclusive lock
///
/// ## Usage
///
/// ```ignore
/// let guard = lock.lock_exclusive(&path, timeout)?;
/// // ... write while holding the lock ...
/// drop(guard); // lock is released
/// ```
pub struct LockGuard {
    release_fn: Option<Box<dyn FnOnce() + Send>>,
}

impl LockGuard {
    /// Creates a guard that runs `release_fn` exactly once when dropped
    pub fn new(release_fn: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release_fn: Some(Box::new(release_fn)),
        }
    }

    /// Explicitly releases the lock, consuming the guard
    pub fn release(mut self) {
        if let Some(release_fn) = self.release_fn.take() {
            release_fn();
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(release_fn) = self.release_fn.take() {
            release_fn();
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("held", &self.release_fn.is_some())
            .finish()
    }
}
