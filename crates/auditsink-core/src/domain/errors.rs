//! Domain error types
//!
//! This module defines error types specific to domain operations and the
//! lock port shared by the append and prune paths.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Unknown severity name
    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    /// A context entry that is not in `key=value` form
    #[error("Invalid context pair: {0}")]
    InvalidContextPair(String),
}

/// Errors raised while acquiring the exclusive audit file lock
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock stayed contended for longer than the configured bound
    #[error("timed out after {waited_ms}ms waiting for exclusive lock on {}", path.display())]
    Timeout { path: PathBuf, waited_ms: u64 },

    /// The lock file could not be opened or the lock call itself failed
    #[error("failed to lock {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    /// Returns true if the failure was contention rather than an I/O error
    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::Timeout { .. })
    }
}
